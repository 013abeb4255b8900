//! Command handler implementation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::mention::extract_mentioned_id;
use super::types::{BotCommand, CommandResult, ExpiryStatus};
use crate::config::ReminderConfig;
use crate::store::RecordStore;

const PERMISSION_DENIED: &str = "❌ Permission denied: this command is for admins only";
const MISSING_MENTION: &str = "❌ Please mention the target user";
const NO_RECORD: &str = "❌ No service record found for you, please contact an admin";

/// Interprets chat commands against the record store.
pub struct CommandHandler {
    /// Prefix every command token starts with (e.g. "/").
    prefix: String,

    /// User records and configuration documents.
    store: Arc<RecordStore>,

    /// In-memory configuration, used for admin checks.
    config: Arc<RwLock<ReminderConfig>>,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(prefix: String, store: Arc<RecordStore>, config: Arc<RwLock<ReminderConfig>>) -> Self {
        Self {
            prefix,
            store,
            config,
        }
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `None` if the message is not one of the known commands.
    pub async fn try_handle(&self, message_text: &str, sender_id: &str) -> Option<CommandResult> {
        let command = BotCommand::parse(message_text, &self.prefix)?;

        debug!("Handling command from {}: {}", sender_id, command);
        let result = self.execute(command, message_text, sender_id).await;
        info!("Command result: success={}", result.success);

        Some(result)
    }

    /// Checks whether `user_id` is an admin in the in-memory configuration.
    pub async fn is_admin(&self, user_id: &str) -> bool {
        self.config.read().await.is_admin(user_id)
    }

    /// Executes a parsed command.
    async fn execute(&self, command: BotCommand, message_text: &str, sender_id: &str) -> CommandResult {
        let is_admin = self.is_admin(sender_id).await;

        if command.is_admin_only() && !is_admin {
            info!("Denied {} for non-admin {}", command.name(), sender_id);
            return CommandResult::error(PERMISSION_DENIED);
        }

        match command {
            BotCommand::SetUsername(username) => {
                self.handle_set_username(username.as_deref(), message_text)
            }
            BotCommand::Extend(days) => self.handle_extend(days.as_deref(), message_text),
            BotCommand::CheckExpiry => self.handle_check_expiry(sender_id),
            BotCommand::ListUsers => self.handle_list_users(),
            BotCommand::Help => self.handle_help(is_admin),
        }
    }

    fn handle_set_username(&self, username: Option<&str>, message_text: &str) -> CommandResult {
        let Some(username) = username else {
            return CommandResult::error(format!(
                "❌ Invalid format, use: {}set-username <platform username> @user",
                self.prefix
            ));
        };

        let Some(target) = extract_mentioned_id(message_text) else {
            return CommandResult::error(MISSING_MENTION);
        };

        match self.store.upsert_user(&target, Some(username), 0) {
            Ok(_) => CommandResult::success(format!(
                "✅ Set platform username for @{target}: {username}"
            )),
            Err(e) => {
                error!("Failed to set username for {}: {}", target, e);
                CommandResult::error(format!("❌ Failed to set username: {e}"))
            }
        }
    }

    fn handle_extend(&self, days: Option<&str>, message_text: &str) -> CommandResult {
        let Some(days) = days else {
            return CommandResult::error(format!(
                "❌ Invalid format, use: {}extend <days> @user",
                self.prefix
            ));
        };

        let days: i64 = match days.parse() {
            Ok(days) if days > 0 => days,
            Ok(_) => return CommandResult::error("❌ Days must be greater than 0"),
            Err(_) => return CommandResult::error("❌ Days must be a number"),
        };

        let Some(target) = extract_mentioned_id(message_text) else {
            return CommandResult::error(MISSING_MENTION);
        };

        match self.store.upsert_user(&target, None, days) {
            Ok(record) => CommandResult::success(format!(
                "✅ Extended service for @{target} by {days} days\nNew expiry date: {}",
                record.expire_date
            )),
            Err(e) => {
                error!("Failed to extend {}: {}", target, e);
                CommandResult::error(format!("❌ Extension failed: {e}"))
            }
        }
    }

    fn handle_check_expiry(&self, sender_id: &str) -> CommandResult {
        let Some(record) = self.store.get_user(sender_id) else {
            return CommandResult::error(NO_RECORD);
        };

        let status = ExpiryStatus::of(&record, self.store.today());

        let message = format!(
            "📊 Your service status:\n\
             👤 Platform username: {}\n\
             📅 Start date: {}\n\
             ⏰ Expiry date: {}\n\
             ⏳ {}",
            or_placeholder(&record.platform_username, "not set"),
            or_placeholder(&record.start_date, "unknown"),
            or_placeholder(&record.expire_date, "unknown"),
            capitalize(&status.to_string()),
        );

        CommandResult::success(message)
    }

    fn handle_list_users(&self) -> CommandResult {
        let records = self.store.load_records();

        if records.is_empty() {
            return CommandResult::success("📋 No user records yet");
        }

        let today = self.store.today();
        let mut lines = vec!["📋 User list:".to_owned()];

        for (user_id, record) in &records {
            let status = ExpiryStatus::of(record, today);
            lines.push(String::new());
            lines.push(format!(
                "👤 {user_id} ({})",
                or_placeholder(&record.platform_username, "not set")
            ));
            lines.push(format!(
                "   Expires: {} ({status})",
                or_placeholder(&record.expire_date, "unknown")
            ));
        }

        CommandResult::success(lines.join("\n"))
    }

    fn handle_help(&self, is_admin: bool) -> CommandResult {
        let mut lines = vec!["📖 Expiry reminder help".to_owned(), String::new()];

        lines.push("🔸 User commands:".to_owned());
        for (usage, desc, _) in BotCommand::all_commands()
            .into_iter()
            .filter(|(_, _, admin_only)| !admin_only)
        {
            lines.push(format!("{}{usage} - {desc}", self.prefix));
        }

        if is_admin {
            lines.push(String::new());
            lines.push("🔸 Admin commands:".to_owned());
            for (usage, desc, _) in BotCommand::all_commands()
                .into_iter()
                .filter(|(_, _, admin_only)| *admin_only)
            {
                lines.push(format!("{}{usage} - {desc}", self.prefix));
            }
        }

        CommandResult::success(lines.join("\n"))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("prefix", &self.prefix)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

/// Upper-cases the first character.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::clock::FixedClock;
    use crate::store::{UserMap, UserRecord};

    const ADMIN: &str = "10001";
    const USER: &str = "20002";

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        clock: Arc<FixedClock>,
        store: Arc<RecordStore>,
        handler: CommandHandler,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FixedClock::new(day(2024, 5, 1)));
        let store = Arc::new(RecordStore::open(dir.path(), clock.clone()).unwrap());
        let config = ReminderConfig {
            admins: vec![ADMIN.to_owned()],
            ..ReminderConfig::default()
        };
        let handler = CommandHandler::new(
            "/".to_owned(),
            Arc::clone(&store),
            Arc::new(RwLock::new(config)),
        );
        Fixture {
            _dir: dir,
            clock,
            store,
            handler,
        }
    }

    async fn run(handler: &CommandHandler, text: &str, sender: &str) -> CommandResult {
        handler.try_handle(text, sender).await.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_commands_are_ignored() {
        let fx = fixture();
        assert!(fx.handler.try_handle("hello", USER).await.is_none());
        assert!(fx.handler.try_handle("/nope", ADMIN).await.is_none());
        assert!(fx.handler.try_handle("   ", ADMIN).await.is_none());
    }

    #[tokio::test]
    async fn test_non_admin_is_denied_without_mutation() {
        let fx = fixture();
        for text in ["/extend 5 @30003", "/set-username eve @30003", "/list-users"] {
            let result = run(&fx.handler, text, USER).await;
            assert!(!result.success);
            assert_eq!(result.message, PERMISSION_DENIED);
        }
        assert!(fx.store.load_records().is_empty());
    }

    #[tokio::test]
    async fn test_extend_creates_and_stacks() {
        let fx = fixture();

        let result = run(&fx.handler, "/extend 5 [CQ:at,qq=30003]", ADMIN).await;
        assert!(result.success);
        assert!(result.message.contains("2024-05-06"));

        fx.clock.advance_days(1);
        let result = run(&fx.handler, "/续时 2 @30003", ADMIN).await;
        assert!(result.success);
        assert!(result.message.contains("2024-05-08"));

        let record = fx.store.get_user("30003").unwrap();
        assert_eq!(record.start_date, "2024-05-01");
        assert_eq!(record.expire_date, "2024-05-08");
    }

    #[tokio::test]
    async fn test_extend_validation() {
        let fx = fixture();

        let result = run(&fx.handler, "/extend", ADMIN).await;
        assert!(result.message.contains("Invalid format"));

        let result = run(&fx.handler, "/extend abc @30003", ADMIN).await;
        assert_eq!(result.message, "❌ Days must be a number");

        let result = run(&fx.handler, "/extend 0 @30003", ADMIN).await;
        assert_eq!(result.message, "❌ Days must be greater than 0");

        let result = run(&fx.handler, "/extend -4 @30003", ADMIN).await;
        assert_eq!(result.message, "❌ Days must be greater than 0");

        let result = run(&fx.handler, "/extend 3", ADMIN).await;
        assert_eq!(result.message, MISSING_MENTION);

        assert!(fx.store.load_records().is_empty());
    }

    #[tokio::test]
    async fn test_extend_overflow_reports_failure() {
        let fx = fixture();
        let result = run(&fx.handler, &format!("/extend {} @30003", i64::MAX), ADMIN).await;
        assert!(!result.success);
        assert!(result.message.starts_with("❌ Extension failed:"));
    }

    #[tokio::test]
    async fn test_extend_with_unreadable_document_keeps_it() {
        let fx = fixture();
        let path = fx.store.users_path().to_path_buf();
        std::fs::write(&path, "{ not json").unwrap();

        let result = run(&fx.handler, "/extend 3 @30003", ADMIN).await;
        assert!(!result.success);
        assert!(result.message.starts_with("❌ Extension failed:"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_set_username() {
        let fx = fixture();

        let result = run(&fx.handler, "/set-username", ADMIN).await;
        assert!(result.message.contains("Invalid format"));

        let result = run(&fx.handler, "/set-username alice", ADMIN).await;
        assert_eq!(result.message, MISSING_MENTION);

        let result = run(&fx.handler, "/yhm alice [CQ:at,qq=30003]", ADMIN).await;
        assert!(result.success);

        let record = fx.store.get_user("30003").unwrap();
        assert_eq!(record.platform_username, "alice");
        assert_eq!(record.expire_date, "2024-05-01");
    }

    #[tokio::test]
    async fn test_check_expiry_states() {
        let fx = fixture();

        let result = run(&fx.handler, "/check-expiry", USER).await;
        assert_eq!(result.message, NO_RECORD);
        assert!(fx.store.get_user(USER).is_none());

        fx.store.upsert_user(USER, Some("bob"), 3).unwrap();
        let result = run(&fx.handler, "/check-expiry", USER).await;
        assert!(result.success);
        assert!(result.message.contains("3 days left"));
        assert!(result.message.contains("bob"));

        fx.clock.advance_days(3);
        let result = run(&fx.handler, "/check-expiry", USER).await;
        assert!(result.message.contains("Expires today"));

        fx.clock.advance_days(2);
        let result = run(&fx.handler, "/查看到期时间", USER).await;
        assert!(result.message.contains("Expired 2 days ago"));
    }

    #[tokio::test]
    async fn test_check_expiry_with_malformed_date() {
        let fx = fixture();
        let mut records = UserMap::new();
        records.insert(
            USER.to_owned(),
            UserRecord {
                platform_username: String::new(),
                start_date: "2024-01-01".to_owned(),
                expire_date: "soon".to_owned(),
                ..UserRecord::default()
            },
        );
        fx.store.save_records(&records);

        let result = run(&fx.handler, "/check-expiry", USER).await;
        assert!(result.success);
        assert!(result.message.contains("Invalid date format"));
        assert!(result.message.contains("not set"));
    }

    #[tokio::test]
    async fn test_list_users() {
        let fx = fixture();

        let result = run(&fx.handler, "/list-users", ADMIN).await;
        assert_eq!(result.message, "📋 No user records yet");

        fx.store.upsert_user("1", Some("alice"), 10).unwrap();
        fx.store.upsert_user("2", None, 0).unwrap();

        let result = run(&fx.handler, "/用户列表", ADMIN).await;
        assert!(result.message.contains("👤 1 (alice)"));
        assert!(result.message.contains("2024-05-11 (10 days left)"));
        assert!(result.message.contains("👤 2 (not set)"));
        assert!(result.message.contains("(expires today)"));
    }

    #[tokio::test]
    async fn test_help_admin_section() {
        let fx = fixture();

        let result = run(&fx.handler, "/help", USER).await;
        assert!(result.message.contains("/check-expiry"));
        assert!(!result.message.contains("Admin commands"));

        let result = run(&fx.handler, "/帮助", ADMIN).await;
        assert!(result.message.contains("Admin commands"));
        assert!(result.message.contains("/extend <days> @user"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("expires today"), "Expires today");
        assert_eq!(capitalize(""), "");
    }
}

//! Command types and definitions.

use std::fmt;

use chrono::NaiveDate;

use crate::store::UserRecord;

/// Available bot commands.
///
/// Arguments are kept raw; the handler validates them after the
/// permission check so that users see the right error first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Set a user's external platform username (admin).
    SetUsername(Option<String>),

    /// Extend a user's service by a number of days (admin).
    Extend(Option<String>),

    /// Show the sender's own service status.
    CheckExpiry,

    /// List every user record (admin).
    ListUsers,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// The first whitespace-delimited token must be `prefix` followed by a
    /// known command word (case-insensitive). Returns `None` for anything
    /// else, including ordinary chat text.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let token = parts.next()?;
        let cmd = token.strip_prefix(prefix)?.to_lowercase();
        let first_arg = parts.next().map(ToOwned::to_owned);

        match cmd.as_str() {
            "set-username" | "yhm" => Some(Self::SetUsername(first_arg)),
            "extend" | "续时" => Some(Self::Extend(first_arg)),
            "check-expiry" | "查看到期时间" => Some(Self::CheckExpiry),
            "list-users" | "用户列表" => Some(Self::ListUsers),
            "help" | "帮助" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetUsername(_) => "set-username",
            Self::Extend(_) => "extend",
            Self::CheckExpiry => "check-expiry",
            Self::ListUsers => "list-users",
            Self::Help => "help",
        }
    }

    /// Whether only admins may run this command.
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        matches!(self, Self::SetUsername(_) | Self::Extend(_) | Self::ListUsers)
    }

    /// Returns all commands as `(usage, description, admin_only)`.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str, bool)> {
        vec![
            ("check-expiry", "Show your service status", false),
            ("help", "Show this help message", false),
            (
                "set-username <name> @user",
                "Set a user's external platform username",
                true,
            ),
            ("extend <days> @user", "Extend a user's service time", true),
            ("list-users", "List all users", true),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetUsername(Some(arg)) | Self::Extend(Some(arg)) => {
                write!(f, "{} {arg}", self.name())
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Where a record stands relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// Expires in this many days.
    Remaining(i64),
    /// Expires today.
    Today,
    /// Expired this many days ago.
    Expired(i64),
    /// The stored expiry date could not be parsed.
    InvalidDate,
}

impl ExpiryStatus {
    /// Computes the status of `record` on `today`.
    #[must_use]
    pub fn of(record: &UserRecord, today: NaiveDate) -> Self {
        match record.days_left(today) {
            Some(days) if days > 0 => Self::Remaining(days),
            Some(0) => Self::Today,
            Some(days) => Self::Expired(-days),
            None => Self::InvalidDate,
        }
    }
}

impl fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(days) => write!(f, "{days} days left"),
            Self::Today => write!(f, "expires today"),
            Self::Expired(days) => write!(f, "expired {days} days ago"),
            Self::InvalidDate => write!(f, "invalid date format"),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

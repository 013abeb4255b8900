//! Command handling module.
//!
//! Processes chat commands sent to the bot. Only five command words are
//! recognized; any other text is ignored without a reply.

mod handler;
mod mention;
mod types;

pub use handler::CommandHandler;
pub use mention::extract_mentioned_id;
pub use types::{BotCommand, CommandResult, ExpiryStatus};

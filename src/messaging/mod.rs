//! Outbound messaging to the hosting chat platform.
//!
//! The host supplies a [`Messenger`]; everything in this crate goes through
//! a [`Dispatcher`], which never lets a delivery failure escape.

mod console;
mod dispatcher;

use async_trait::async_trait;
use thiserror::Error;

pub use console::LogMessenger;
pub use dispatcher::Dispatcher;

/// Errors reported by a host messenger.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Recipient not reachable: {0}")]
    Unreachable(String),

    #[error("Delivery rejected by host: {0}")]
    Rejected(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Messaging capabilities provided by the hosting chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Broadcasts `text` to the configured group channel.
    async fn send_group_message(&self, text: &str) -> Result<(), DispatchError>;

    /// Sends `text` directly to one user.
    async fn send_private_message(&self, user_id: &str, text: &str) -> Result<(), DispatchError>;
}

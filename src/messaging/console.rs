//! Messenger for running without a chat platform.

use async_trait::async_trait;
use tracing::info;

use super::{DispatchError, Messenger};

/// Writes every outbound message to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send_group_message(&self, text: &str) -> Result<(), DispatchError> {
        info!(target: "outbound", "[group] {}", text);
        Ok(())
    }

    async fn send_private_message(&self, user_id: &str, text: &str) -> Result<(), DispatchError> {
        info!(target: "outbound", "[private -> {}] {}", user_id, text);
        Ok(())
    }
}

//! Best-effort message dispatch.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::Messenger;

/// Fire-and-forget front for an optional host messenger.
///
/// Without a messenger the would-be message is logged. A failed delivery is
/// logged and reported as `false`; it never aborts the caller.
#[derive(Clone, Default)]
pub struct Dispatcher {
    messenger: Option<Arc<dyn Messenger>>,
}

impl Dispatcher {
    /// Creates a dispatcher over the host's messenger, if any.
    #[must_use]
    pub fn new(messenger: Option<Arc<dyn Messenger>>) -> Self {
        Self { messenger }
    }

    /// Whether a host messenger is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.messenger.is_some()
    }

    /// Broadcasts to the group channel. Returns whether delivery succeeded.
    pub async fn broadcast(&self, text: &str) -> bool {
        let Some(messenger) = &self.messenger else {
            info!("Group message: {}", text);
            return false;
        };

        match messenger.send_group_message(text).await {
            Ok(()) => {
                debug!("Group message delivered");
                true
            }
            Err(e) => {
                error!("Failed to send group message: {}", e);
                false
            }
        }
    }

    /// Sends a private message. Returns whether delivery succeeded.
    pub async fn direct(&self, user_id: &str, text: &str) -> bool {
        let Some(messenger) = &self.messenger else {
            info!("Private message to {}: {}", user_id, text);
            return false;
        };

        match messenger.send_private_message(user_id, text).await {
            Ok(()) => {
                debug!("Private message delivered to {}", user_id);
                true
            }
            Err(e) => {
                error!("Failed to send private message to {}: {}", user_id, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("connected", &self.is_connected())
            .finish()
    }
}

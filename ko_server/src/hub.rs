//! In-process notification routing for WebSocket subscribers.
//!
//! The hub maps entrant refs to bounded channels. Bracket operations publish
//! through the [`NotificationGateway`] impl; each WebSocket connection drains
//! the receiver for its entrant. Entrants without an open connection simply
//! miss the message, delivery is best-effort.

use std::collections::HashMap;

use async_trait::async_trait;
use knockout::bracket::models::EntrantRef;
use knockout::notify::{Notification, NotificationError, NotificationGateway};
use tokio::sync::{RwLock, mpsc};

/// Buffered notifications per entrant before sends start failing.
const CHANNEL_CAPACITY: usize = 32;

/// Routes notifications to connected entrants.
#[derive(Debug, Default)]
pub struct NotificationHub {
    channels: RwLock<HashMap<EntrantRef, mpsc::Sender<Notification>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a notification channel for an entrant.
    ///
    /// Replaces any existing registration: the previous receiver's channel
    /// closes, which ends the stale connection's drain loop.
    pub async fn register(&self, entrant: EntrantRef) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.channels.write().await.insert(entrant, tx);
        rx
    }

    /// Remove an entrant's registration once its receiver is gone.
    ///
    /// Keeps the entry when the stored sender still has a live receiver, so
    /// a reconnect that replaced the registration is not torn down by the
    /// old connection's cleanup.
    pub async fn unregister(&self, entrant: EntrantRef) {
        let mut channels = self.channels.write().await;
        if let Some(sender) = channels.get(&entrant)
            && sender.is_closed()
        {
            channels.remove(&entrant);
        }
    }

    /// Whether an entrant currently has a registered channel.
    pub async fn connected(&self, entrant: EntrantRef) -> bool {
        self.channels.read().await.contains_key(&entrant)
    }
}

#[async_trait]
impl NotificationGateway for NotificationHub {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let channels = self.channels.read().await;
        match channels.get(&notification.entrant) {
            Some(sender) => sender
                .try_send(notification)
                .map_err(|e| NotificationError::Delivery(e.to_string())),
            None => {
                tracing::debug!(
                    "No active connection for entrant {}, dropping notification",
                    notification.entrant
                );
                Ok(())
            }
        }
    }
}

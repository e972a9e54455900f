//! Post-commit notification dispatch.
//!
//! Bracket mutations queue notifications while their transaction is open and
//! hand them to [`dispatch`] only after the commit succeeds. Delivery is
//! fire-and-forget: a failed send is logged and never unwinds the state
//! change that produced it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bracket::models::EntrantRef;

/// A message addressed to one entrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub entrant: EntrantRef,
    pub title: String,
    pub message: String,
    pub link: String,
}

/// Notification delivery errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Gateway could not deliver the message
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivery channel for bracket notifications.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver one notification to its entrant.
    async fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Gateway that writes notifications to the application log.
///
/// Default gateway for library consumers with no delivery channel wired up;
/// the server swaps in its websocket hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationGateway for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(&notification)
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        log::info!("notification: {payload}");
        Ok(())
    }
}

/// Deliver a batch of notifications on a background task.
///
/// Callers invoke this after their transaction commits. Sends happen in
/// order; a failure is logged and the rest of the batch still goes out.
pub fn dispatch(gateway: Arc<dyn NotificationGateway>, notifications: Vec<Notification>) {
    if notifications.is_empty() {
        return;
    }

    tokio::spawn(async move {
        for notification in notifications {
            let entrant = notification.entrant;
            if let Err(e) = gateway.send(notification).await {
                log::warn!("Failed to deliver notification to entrant {entrant}: {e}");
            }
        }
    });
}

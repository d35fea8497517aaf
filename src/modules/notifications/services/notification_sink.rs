use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::core::Result;

/// Outbound hook for user-facing notices (loan completion)
///
/// Delivery is fire-and-forget: callers log a failed notification and carry
/// on, the triggering write is never undone because of it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()>;
}

/// Event published to notification subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanNotification {
    pub user_id: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Writes notifications to the log only
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()> {
        info!(user_id = user_id, message = message, "Notification");
        Ok(())
    }
}

/// Fans notifications out to in-process subscribers (websocket bridges,
/// audit writers)
#[derive(Debug, Clone)]
pub struct BroadcastNotificationSink {
    sender: broadcast::Sender<LoanNotification>,
}

impl BroadcastNotificationSink {
    /// `capacity` bounds how far a slow subscriber may lag before it starts
    /// missing events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoanNotification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotificationSink {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotificationSink {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()> {
        let notification = LoanNotification {
            user_id: user_id.to_string(),
            message: message.to_string(),
            sent_at: Utc::now(),
        };

        info!(user_id = user_id, message = message, "Sending notification");

        // No subscribers is not a delivery failure
        if self.sender.send(notification).is_err() {
            debug!(user_id = user_id, "Notification dropped: no subscribers");
        }

        Ok(())
    }
}

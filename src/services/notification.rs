use log::{info, warn};
use mongodb::Database;
use thiserror::Error;

use crate::db::mongo::NOTIFICATIONS;
use crate::models::Notification;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outbound channel for user-facing notifications.
#[rocket::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Stores notifications in the `notifications` collection for clients to poll.
pub struct MongoNotificationSink {
    db: Database,
}

impl MongoNotificationSink {
    pub fn new(db: Database) -> Self {
        MongoNotificationSink { db }
    }
}

#[rocket::async_trait]
impl NotificationSink for MongoNotificationSink {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.db
            .collection::<Notification>(NOTIFICATIONS)
            .insert_one(&notification, None)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Delivers a notification without letting a delivery failure reach the caller.
pub async fn notify(sink: &dyn NotificationSink, notification: Notification) {
    let target = notification.target_id;
    let kind = notification.kind;

    match sink.send(notification).await {
        Ok(()) => info!("Notification {:?} sent to {}", kind, target),
        Err(e) => warn!("Failed to send {:?} notification to {}: {}", kind, target, e),
    }
}

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewApplication,
    ApplicationAccepted,
    ApplicationRejected,
    NewReview,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub target_id: ObjectId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime,
}

impl Notification {
    pub fn new(
        target_id: ObjectId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Notification {
            id: None,
            target_id,
            kind,
            title: title.into(),
            message: message.into(),
            link: link.into(),
            read: false,
            created_at: DateTime::now(),
        }
    }
}

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use super::{PostCategory, PostStatus, PublicProfile};
use crate::utils::timestamp;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }
}

/// Unique per (post_id, provider_id).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Application {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub post_id: ObjectId,
    pub provider_id: ObjectId,
    pub message: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct CreateApplicationDto {
    pub post_id: String,
    #[validate(length(min = 10, max = 1000, message = "Message must be 10-1000 characters"))]
    pub message: String,
}

impl CreateApplicationDto {
    pub const FIELD_ORDER: &'static [&'static str] = &["post_id", "message"];

    /// The DTO as it will be stored, so length rules see the stored text.
    pub fn trimmed(&self) -> Self {
        CreateApplicationDto {
            post_id: self.post_id.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

/// Statuses a post owner may decide on.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationDecision {
    Accepted,
    Rejected,
}

impl From<ApplicationDecision> for ApplicationStatus {
    fn from(decision: ApplicationDecision) -> Self {
        match decision {
            ApplicationDecision::Accepted => ApplicationStatus::Accepted,
            ApplicationDecision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateApplicationStatusDto {
    pub status: ApplicationDecision,
}

#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct ApplicationResponse {
    pub id: String,
    pub post_id: String,
    pub provider_id: String,
    pub message: String,
    pub status: ApplicationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Application> for ApplicationResponse {
    fn from(application: Application) -> Self {
        ApplicationResponse {
            id: application.id.map(|id| id.to_hex()).unwrap_or_default(),
            post_id: application.post_id.to_hex(),
            provider_id: application.provider_id.to_hex(),
            message: application.message,
            status: application.status,
            created_at: timestamp(&application.created_at),
            updated_at: timestamp(&application.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub category: PostCategory,
    pub budget: f64,
    pub status: PostStatus,
    pub owner_name: Option<String>,
}

/// A provider's own application, joined with the post it targets.
#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct ProviderApplicationView {
    #[serde(flatten)]
    pub application: ApplicationResponse,
    pub post: Option<PostSummary>,
}

/// An application on a seeker's post, joined with the applicant.
#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct PostApplicationView {
    #[serde(flatten)]
    pub application: ApplicationResponse,
    pub provider: Option<PublicProfile>,
    pub has_review: bool,
}

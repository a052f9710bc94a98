use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use crate::utils::timestamp;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema, FromFormField)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    #[field(value = "web_development")]
    WebDevelopment,
    #[field(value = "mobile_development")]
    MobileDevelopment,
    #[field(value = "design")]
    Design,
    #[field(value = "writing")]
    Writing,
    #[field(value = "marketing")]
    Marketing,
    #[field(value = "data_science")]
    DataScience,
    #[field(value = "other")]
    Other,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::WebDevelopment => "web_development",
            PostCategory::MobileDevelopment => "mobile_development",
            PostCategory::Design => "design",
            PostCategory::Writing => "writing",
            PostCategory::Marketing => "marketing",
            PostCategory::DataScience => "data_science",
            PostCategory::Other => "other",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema, FromFormField)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    #[field(value = "OPEN")]
    Open,
    #[field(value = "CLOSED")]
    Closed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Open => "OPEN",
            PostStatus::Closed => "CLOSED",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema, Validate)]
pub struct Location {
    #[validate(length(max = 100, message = "City must be at most 100 characters"))]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: Option<String>,
    #[serde(default)]
    pub remote: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Milestone {
    pub title: String,
    pub amount: f64,
    pub due_date: Option<DateTime>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub title: String,
    pub description: String,
    pub category: PostCategory,
    pub budget: f64,
    pub status: PostStatus,
    #[serde(default)]
    pub skills: Vec<ObjectId>,
    pub location: Option<Location>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, Clone, JsonSchema, Validate)]
pub struct MilestoneDto {
    #[validate(length(min = 1, max = 100, message = "Milestone title must be 1-100 characters"))]
    pub title: String,
    #[validate(range(min = 0.0, message = "Milestone amount cannot be negative"))]
    pub amount: f64,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl MilestoneDto {
    pub fn trimmed(&self) -> Self {
        MilestoneDto {
            title: self.title.trim().to_string(),
            ..self.clone()
        }
    }
}

impl From<&MilestoneDto> for Milestone {
    fn from(dto: &MilestoneDto) -> Self {
        Milestone {
            title: dto.title.clone(),
            amount: dto.amount,
            due_date: dto
                .due_date
                .map(|due| DateTime::from_millis(due.timestamp_millis())),
        }
    }
}

#[derive(Debug, Deserialize, Clone, JsonSchema, Validate)]
pub struct CreatePostDto {
    #[validate(length(min = 5, max = 100, message = "Title must be 5-100 characters"))]
    pub title: String,
    #[validate(length(min = 20, max = 5000, message = "Description must be 20-5000 characters"))]
    pub description: String,
    pub category: PostCategory,
    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub budget: f64,
    #[serde(default)]
    pub skills: Vec<String>,
    #[validate]
    pub location: Option<Location>,
    #[serde(default)]
    #[validate]
    pub milestones: Vec<MilestoneDto>,
}

impl CreatePostDto {
    pub const FIELD_ORDER: &'static [&'static str] =
        &["title", "description", "category", "budget", "skills", "location", "milestones"];

    /// Text fields without surrounding whitespace, as they are stored.
    pub fn trimmed(&self) -> Self {
        CreatePostDto {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            milestones: self.milestones.iter().map(MilestoneDto::trimmed).collect(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, JsonSchema, Validate)]
pub struct UpdatePostDto {
    #[validate(length(min = 5, max = 100, message = "Title must be 5-100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 20, max = 5000, message = "Description must be 20-5000 characters"))]
    pub description: Option<String>,
    pub category: Option<PostCategory>,
    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub budget: Option<f64>,
    pub status: Option<PostStatus>,
    pub skills: Option<Vec<String>>,
    #[validate]
    pub location: Option<Location>,
    pub milestones: Option<Vec<MilestoneDto>>,
}

impl UpdatePostDto {
    pub const FIELD_ORDER: &'static [&'static str] = &[
        "title",
        "description",
        "category",
        "budget",
        "status",
        "skills",
        "location",
        "milestones",
    ];

    pub fn trimmed(&self) -> Self {
        UpdatePostDto {
            title: self.title.as_deref().map(|t| t.trim().to_string()),
            description: self.description.as_deref().map(|d| d.trim().to_string()),
            milestones: self
                .milestones
                .as_ref()
                .map(|m| m.iter().map(MilestoneDto::trimmed).collect()),
            ..self.clone()
        }
    }
}

/// Validated set of changes for a post, ready to be written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<PostCategory>,
    pub budget: Option<f64>,
    pub status: Option<PostStatus>,
    pub skills: Option<Vec<ObjectId>>,
    pub location: Option<Location>,
    pub milestones: Option<Vec<Milestone>>,
}

#[derive(FromForm, Debug, Default, Deserialize, JsonSchema)]
pub struct PostBrowseQuery {
    pub category: Option<PostCategory>,
    pub status: Option<PostStatus>,
    pub remote: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Store-level post filter built from a browse query.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFilter {
    pub category: Option<PostCategory>,
    pub status: Option<PostStatus>,
    pub remote: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct MilestoneResponse {
    pub title: String,
    pub amount: f64,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct PostResponse {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub category: PostCategory,
    pub budget: f64,
    pub status: PostStatus,
    pub skills: Vec<String>,
    pub location: Option<Location>,
    pub milestones: Vec<MilestoneResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        PostResponse {
            id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner_id: post.owner_id.to_hex(),
            title: post.title,
            description: post.description,
            category: post.category,
            budget: post.budget,
            status: post.status,
            skills: post.skills.iter().map(|s| s.to_hex()).collect(),
            location: post.location,
            milestones: post
                .milestones
                .into_iter()
                .map(|m| MilestoneResponse {
                    title: m.title,
                    amount: m.amount,
                    due_date: m.due_date.as_ref().map(timestamp),
                })
                .collect(),
            created_at: timestamp(&post.created_at),
            updated_at: timestamp(&post.updated_at),
        }
    }
}

/// A post joined with its owner's name and how many applications it has.
#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostResponse,
    pub owner_name: Option<String>,
    pub application_count: u64,
}

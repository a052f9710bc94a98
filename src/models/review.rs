use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use crate::utils::timestamp;

/// One per application; `seeker_id` authored it, `provider_id` is rated.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub seeker_id: ObjectId,
    pub provider_id: ObjectId,
    pub application_id: ObjectId,
    pub rating: i32, // 1-5
    pub comment: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct CreateReviewDto {
    pub application_id: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
}

impl CreateReviewDto {
    pub const FIELD_ORDER: &'static [&'static str] = &["application_id", "rating", "comment"];
}

#[derive(FromForm, Debug, Default, serde::Deserialize, JsonSchema)]
pub struct ProviderReviewsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct ReviewResponse {
    pub id: String,
    pub seeker_id: String,
    pub provider_id: String,
    pub application_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        ReviewResponse {
            id: review.id.map(|id| id.to_hex()).unwrap_or_default(),
            seeker_id: review.seeker_id.to_hex(),
            provider_id: review.provider_id.to_hex(),
            application_id: review.application_id.to_hex(),
            rating: review.rating,
            comment: review.comment,
            created_at: timestamp(&review.created_at),
        }
    }
}

/// Public listing entry: the review plus who wrote it.
#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct ProviderReviewView {
    #[serde(flatten)]
    pub review: ReviewResponse,
    pub seeker_name: Option<String>,
}

/// A seeker's own review with enough context to show what it was for.
#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct SeekerReviewView {
    #[serde(flatten)]
    pub review: ReviewResponse,
    pub provider_name: Option<String>,
    pub post_title: Option<String>,
}

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Seeker,
    Provider,
}

/// Authenticated caller, as resolved from the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: ObjectId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: ObjectId, role: Role) -> Self {
        Identity { user_id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    // Derived from reviews, only written by the rating aggregator.
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Fields of a user that other parties are allowed to see.
#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub average_rating: f64,
    pub review_count: i32,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        PublicProfile {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            bio: user.bio,
            is_verified: user.is_verified,
            average_rating: user.average_rating,
            review_count: user.review_count,
        }
    }
}

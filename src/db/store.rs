use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{
    Application, ApplicationStatus, Post, PostChanges, PostFilter, PostStatus, Review, User,
};
use crate::utils::Page;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate key")]
    Duplicate,

    #[error("database error: {0}")]
    Database(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            StoreError::Duplicate
        } else {
            StoreError::Database(err.to_string())
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    const DUPLICATE_KEY: i32 = 11000;
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[rocket::async_trait]
pub trait PostStore {
    async fn insert_post(&self, post: Post) -> StoreResult<Post>;

    async fn find_post(&self, id: ObjectId) -> StoreResult<Option<Post>>;

    async fn find_posts(&self, ids: &[ObjectId]) -> StoreResult<Vec<Post>>;

    /// Newest first, with the total number of matches.
    async fn browse_posts(&self, filter: &PostFilter, page: Page) -> StoreResult<(Vec<Post>, u64)>;

    /// Newest first.
    async fn posts_by_owner(&self, owner_id: ObjectId) -> StoreResult<Vec<Post>>;

    async fn update_post(&self, id: ObjectId, changes: &PostChanges) -> StoreResult<Option<Post>>;

    async fn set_post_status(&self, id: ObjectId, status: PostStatus) -> StoreResult<()>;

    async fn delete_post(&self, id: ObjectId) -> StoreResult<bool>;
}

#[rocket::async_trait]
pub trait ApplicationStore {
    /// Fails with `StoreError::Duplicate` when (post_id, provider_id) already exists.
    async fn insert_application(&self, application: Application) -> StoreResult<Application>;

    async fn find_application(&self, id: ObjectId) -> StoreResult<Option<Application>>;

    async fn find_application_by(
        &self,
        post_id: ObjectId,
        provider_id: ObjectId,
    ) -> StoreResult<Option<Application>>;

    /// Newest first.
    async fn applications_for_post(&self, post_id: ObjectId) -> StoreResult<Vec<Application>>;

    /// Newest first.
    async fn applications_by_provider(&self, provider_id: ObjectId) -> StoreResult<Vec<Application>>;

    async fn find_applications(&self, ids: &[ObjectId]) -> StoreResult<Vec<Application>>;

    async fn count_applications_for_post(&self, post_id: ObjectId) -> StoreResult<u64>;

    async fn set_application_status(
        &self,
        id: ObjectId,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>>;

    async fn delete_application(&self, id: ObjectId) -> StoreResult<bool>;

    async fn delete_applications_for_post(&self, post_id: ObjectId) -> StoreResult<u64>;
}

/// Average and count of every review naming one provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i32,
}

#[rocket::async_trait]
pub trait ReviewStore {
    /// Fails with `StoreError::Duplicate` when the application already has a review.
    async fn insert_review(&self, review: Review) -> StoreResult<Review>;

    async fn find_review(&self, id: ObjectId) -> StoreResult<Option<Review>>;

    async fn find_review_for_application(&self, application_id: ObjectId) -> StoreResult<Option<Review>>;

    /// Subset of `application_ids` that already carry a review.
    async fn reviewed_applications(&self, application_ids: &[ObjectId]) -> StoreResult<Vec<ObjectId>>;

    /// Newest first, with the total number of reviews for the provider.
    async fn reviews_for_provider(&self, provider_id: ObjectId, page: Page) -> StoreResult<(Vec<Review>, u64)>;

    /// Newest first.
    async fn reviews_by_seeker(&self, seeker_id: ObjectId) -> StoreResult<Vec<Review>>;

    async fn delete_review(&self, id: ObjectId) -> StoreResult<bool>;

    /// `None` when the provider has no reviews.
    async fn rating_summary(&self, provider_id: ObjectId) -> StoreResult<Option<RatingSummary>>;
}

#[rocket::async_trait]
pub trait UserStore {
    async fn find_user(&self, id: ObjectId) -> StoreResult<Option<User>>;

    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>>;

    async fn set_rating(&self, user_id: ObjectId, average: f64, count: i32) -> StoreResult<()>;
}

/// Everything the managers need from persistence.
pub trait MarketStore: PostStore + ApplicationStore + ReviewStore + UserStore + Send + Sync {}

impl<T> MarketStore for T where T: PostStore + ApplicationStore + ReviewStore + UserStore + Send + Sync {}

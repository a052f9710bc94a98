use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database};
use rocket::futures::TryStreamExt;

use super::store::*;
use crate::models::{
    Application, ApplicationStatus, Post, PostChanges, PostFilter, PostStatus, Review, User,
};
use crate::utils::Page;

pub const POSTS: &str = "posts";
pub const APPLICATIONS: &str = "applications";
pub const REVIEWS: &str = "reviews";
pub const USERS: &str = "users";
pub const NOTIFICATIONS: &str = "notifications";

/// MongoDB-backed persistence handle. Cheap to clone.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        MongoStore { db }
    }

    fn posts(&self) -> Collection<Post> {
        self.db.collection::<Post>(POSTS)
    }

    fn applications(&self) -> Collection<Application> {
        self.db.collection::<Application>(APPLICATIONS)
    }

    fn reviews(&self) -> Collection<Review> {
        self.db.collection::<Review>(REVIEWS)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>(USERS)
    }
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1 }).build()
}

fn returning_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

fn inserted_id(result: mongodb::results::InsertOneResult) -> StoreResult<ObjectId> {
    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| StoreError::Database("Inserted document has no ObjectId".to_string()))
}

fn browse_filter(filter: &PostFilter) -> Document {
    let mut query = doc! {};
    if let Some(category) = filter.category {
        query.insert("category", category.as_str());
    }
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(remote) = filter.remote {
        query.insert("location.remote", remote);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.insert(
            "title",
            doc! { "$regex": regex::escape(search), "$options": "i" },
        );
    }
    query
}

fn changes_document(changes: &PostChanges) -> StoreResult<Document> {
    let mut set = doc! { "updated_at": DateTime::now() };

    if let Some(ref title) = changes.title {
        set.insert("title", title.clone());
    }
    if let Some(ref description) = changes.description {
        set.insert("description", description.clone());
    }
    if let Some(category) = changes.category {
        set.insert("category", category.as_str());
    }
    if let Some(budget) = changes.budget {
        set.insert("budget", budget);
    }
    if let Some(status) = changes.status {
        set.insert("status", status.as_str());
    }
    if let Some(ref skills) = changes.skills {
        set.insert("skills", skills.clone());
    }
    if let Some(ref location) = changes.location {
        let location = mongodb::bson::to_bson(location)
            .map_err(|e| StoreError::Database(format!("Failed to serialize location: {}", e)))?;
        set.insert("location", location);
    }
    if let Some(ref milestones) = changes.milestones {
        let milestones = mongodb::bson::to_bson(milestones)
            .map_err(|e| StoreError::Database(format!("Failed to serialize milestones: {}", e)))?;
        set.insert("milestones", milestones);
    }

    Ok(doc! { "$set": set })
}

#[rocket::async_trait]
impl PostStore for MongoStore {
    async fn insert_post(&self, mut post: Post) -> StoreResult<Post> {
        let result = self.posts().insert_one(&post, None).await?;
        post.id = Some(inserted_id(result)?);
        Ok(post)
    }

    async fn find_post(&self, id: ObjectId) -> StoreResult<Option<Post>> {
        Ok(self.posts().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_posts(&self, ids: &[ObjectId]) -> StoreResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.posts().find(doc! { "_id": { "$in": ids.to_vec() } }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn browse_posts(&self, filter: &PostFilter, page: Page) -> StoreResult<(Vec<Post>, u64)> {
        let query = browse_filter(filter);

        let find_options = FindOptions::builder()
            .skip(page.skip())
            .limit(page.limit)
            .sort(doc! { "created_at": -1 })
            .build();

        let posts = self
            .posts()
            .find(query.clone(), find_options)
            .await?
            .try_collect()
            .await?;

        let total = self.posts().count_documents(query, None).await?;

        Ok((posts, total))
    }

    async fn posts_by_owner(&self, owner_id: ObjectId) -> StoreResult<Vec<Post>> {
        let cursor = self
            .posts()
            .find(doc! { "owner_id": owner_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_post(&self, id: ObjectId, changes: &PostChanges) -> StoreResult<Option<Post>> {
        let update = changes_document(changes)?;
        Ok(self
            .posts()
            .find_one_and_update(doc! { "_id": id }, update, returning_updated())
            .await?)
    }

    async fn set_post_status(&self, id: ObjectId, status: PostStatus) -> StoreResult<()> {
        self.posts()
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "status": status.as_str(),
                        "updated_at": DateTime::now()
                    }
                },
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete_post(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.posts().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

#[rocket::async_trait]
impl ApplicationStore for MongoStore {
    async fn insert_application(&self, mut application: Application) -> StoreResult<Application> {
        let result = self.applications().insert_one(&application, None).await?;
        application.id = Some(inserted_id(result)?);
        Ok(application)
    }

    async fn find_application(&self, id: ObjectId) -> StoreResult<Option<Application>> {
        Ok(self.applications().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_application_by(
        &self,
        post_id: ObjectId,
        provider_id: ObjectId,
    ) -> StoreResult<Option<Application>> {
        Ok(self
            .applications()
            .find_one(doc! { "post_id": post_id, "provider_id": provider_id }, None)
            .await?)
    }

    async fn applications_for_post(&self, post_id: ObjectId) -> StoreResult<Vec<Application>> {
        let cursor = self
            .applications()
            .find(doc! { "post_id": post_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn applications_by_provider(&self, provider_id: ObjectId) -> StoreResult<Vec<Application>> {
        let cursor = self
            .applications()
            .find(doc! { "provider_id": provider_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_applications(&self, ids: &[ObjectId]) -> StoreResult<Vec<Application>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .applications()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_applications_for_post(&self, post_id: ObjectId) -> StoreResult<u64> {
        Ok(self
            .applications()
            .count_documents(doc! { "post_id": post_id }, None)
            .await?)
    }

    async fn set_application_status(
        &self,
        id: ObjectId,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        Ok(self
            .applications()
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "status": status.as_str(),
                        "updated_at": DateTime::now()
                    }
                },
                returning_updated(),
            )
            .await?)
    }

    async fn delete_application(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.applications().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_applications_for_post(&self, post_id: ObjectId) -> StoreResult<u64> {
        let result = self
            .applications()
            .delete_many(doc! { "post_id": post_id }, None)
            .await?;
        Ok(result.deleted_count)
    }
}

#[rocket::async_trait]
impl ReviewStore for MongoStore {
    async fn insert_review(&self, mut review: Review) -> StoreResult<Review> {
        let result = self.reviews().insert_one(&review, None).await?;
        review.id = Some(inserted_id(result)?);
        Ok(review)
    }

    async fn find_review(&self, id: ObjectId) -> StoreResult<Option<Review>> {
        Ok(self.reviews().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_review_for_application(&self, application_id: ObjectId) -> StoreResult<Option<Review>> {
        Ok(self
            .reviews()
            .find_one(doc! { "application_id": application_id }, None)
            .await?)
    }

    async fn reviewed_applications(&self, application_ids: &[ObjectId]) -> StoreResult<Vec<ObjectId>> {
        if application_ids.is_empty() {
            return Ok(Vec::new());
        }
        let reviews: Vec<Review> = self
            .reviews()
            .find(doc! { "application_id": { "$in": application_ids.to_vec() } }, None)
            .await?
            .try_collect()
            .await?;
        Ok(reviews.into_iter().map(|r| r.application_id).collect())
    }

    async fn reviews_for_provider(&self, provider_id: ObjectId, page: Page) -> StoreResult<(Vec<Review>, u64)> {
        let filter = doc! { "provider_id": provider_id };

        let find_options = FindOptions::builder()
            .skip(page.skip())
            .limit(page.limit)
            .sort(doc! { "created_at": -1 })
            .build();

        let reviews = self
            .reviews()
            .find(filter.clone(), find_options)
            .await?
            .try_collect()
            .await?;

        let total = self.reviews().count_documents(filter, None).await?;

        Ok((reviews, total))
    }

    async fn reviews_by_seeker(&self, seeker_id: ObjectId) -> StoreResult<Vec<Review>> {
        let cursor = self
            .reviews()
            .find(doc! { "seeker_id": seeker_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_review(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.reviews().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn rating_summary(&self, provider_id: ObjectId) -> StoreResult<Option<RatingSummary>> {
        let pipeline = vec![
            doc! { "$match": { "provider_id": provider_id } },
            doc! {
                "$group": {
                    "_id": "$provider_id",
                    "average": { "$avg": "$rating" },
                    "count": { "$sum": 1 }
                }
            },
        ];

        let mut cursor = self.reviews().aggregate(pipeline, None).await?;
        let Some(group) = cursor.try_next().await? else {
            return Ok(None);
        };

        let average = group
            .get_f64("average")
            .map_err(|e| StoreError::Database(format!("Malformed rating average: {}", e)))?;
        let count = group
            .get_i32("count")
            .map_err(|e| StoreError::Database(format!("Malformed rating count: {}", e)))?;

        Ok(Some(RatingSummary { average, count }))
    }
}

#[rocket::async_trait]
impl UserStore for MongoStore {
    async fn find_user(&self, id: ObjectId) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.users().find(doc! { "_id": { "$in": ids.to_vec() } }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_rating(&self, user_id: ObjectId, average: f64, count: i32) -> StoreResult<()> {
        self.users()
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": {
                        "average_rating": average,
                        "review_count": count,
                        "updated_at": DateTime::now()
                    }
                },
                None,
            )
            .await?;
        Ok(())
    }
}

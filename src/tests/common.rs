use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mongodb::bson::{oid::ObjectId, DateTime};

use crate::db::*;
use crate::models::*;
use crate::services::{
    ApplicationManager, NotificationSink, NotifyError, PostManager, ProviderDirectory,
    ReviewManager,
};
use crate::utils::Page;

#[derive(Default)]
struct Tables {
    posts: Vec<Post>,
    applications: Vec<Application>,
    reviews: Vec<Review>,
    users: Vec<User>,
}

/// In-memory store with the same unique constraints as the MongoDB indexes.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    // Makes the existence pre-checks miss stored rows, as a concurrent
    // writer would, so only the unique constraint stands in the way.
    hide_existing: AtomicBool,
}

impl MemoryStore {
    pub fn add_user(&self, name: &str, role: Role) -> Identity {
        let id = ObjectId::new();
        let now = DateTime::now();
        self.tables.lock().unwrap().users.push(User {
            id: Some(id),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            bio: None,
            is_verified: false,
            average_rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        });
        Identity::new(id, role)
    }

    pub fn user(&self, id: ObjectId) -> User {
        self.tables
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == Some(id))
            .cloned()
            .expect("user exists")
    }

    pub fn post(&self, id: ObjectId) -> Option<Post> {
        self.tables.lock().unwrap().posts.iter().find(|p| p.id == Some(id)).cloned()
    }

    pub fn application(&self, id: ObjectId) -> Option<Application> {
        self.tables
            .lock()
            .unwrap()
            .applications
            .iter()
            .find(|a| a.id == Some(id))
            .cloned()
    }

    pub fn application_count(&self) -> usize {
        self.tables.lock().unwrap().applications.len()
    }

    pub fn review_count(&self) -> usize {
        self.tables.lock().unwrap().reviews.len()
    }

    pub fn hide_existing(&self, hide: bool) {
        self.hide_existing.store(hide, Ordering::SeqCst);
    }

    fn hiding(&self) -> bool {
        self.hide_existing.load(Ordering::SeqCst)
    }
}

fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

#[rocket::async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, mut post: Post) -> StoreResult<Post> {
        post.id = Some(ObjectId::new());
        self.tables.lock().unwrap().posts.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: ObjectId) -> StoreResult<Option<Post>> {
        Ok(self.post(id))
    }

    async fn find_posts(&self, ids: &[ObjectId]) -> StoreResult<Vec<Post>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn browse_posts(&self, filter: &PostFilter, page: Page) -> StoreResult<(Vec<Post>, u64)> {
        let tables = self.tables.lock().unwrap();
        let search = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let matching = newest_first(tables.posts.iter().filter(|p| {
            filter.category.is_none_or(|c| p.category == c)
                && filter.status.is_none_or(|s| p.status == s)
                && filter
                    .remote
                    .is_none_or(|r| p.location.as_ref().is_some_and(|l| l.remote == r))
                && search
                    .as_deref()
                    .is_none_or(|s| p.title.to_lowercase().contains(s))
        }))
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn posts_by_owner(&self, owner_id: ObjectId) -> StoreResult<Vec<Post>> {
        let tables = self.tables.lock().unwrap();
        Ok(newest_first(tables.posts.iter().filter(|p| p.owner_id == owner_id))
            .into_iter()
            .cloned()
            .collect())
    }

    async fn update_post(&self, id: ObjectId, changes: &PostChanges) -> StoreResult<Option<Post>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == Some(id)) else {
            return Ok(None);
        };

        if let Some(ref title) = changes.title {
            post.title = title.clone();
        }
        if let Some(ref description) = changes.description {
            post.description = description.clone();
        }
        if let Some(category) = changes.category {
            post.category = category;
        }
        if let Some(budget) = changes.budget {
            post.budget = budget;
        }
        if let Some(status) = changes.status {
            post.status = status;
        }
        if let Some(ref skills) = changes.skills {
            post.skills = skills.clone();
        }
        if let Some(ref location) = changes.location {
            post.location = Some(location.clone());
        }
        if let Some(ref milestones) = changes.milestones {
            post.milestones = milestones.clone();
        }
        post.updated_at = DateTime::now();
        Ok(Some(post.clone()))
    }

    async fn set_post_status(&self, id: ObjectId, status: PostStatus) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(post) = tables.posts.iter_mut().find(|p| p.id == Some(id)) {
            post.status = status;
            post.updated_at = DateTime::now();
        }
        Ok(())
    }

    async fn delete_post(&self, id: ObjectId) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != Some(id));
        Ok(tables.posts.len() < before)
    }
}

#[rocket::async_trait]
impl ApplicationStore for MemoryStore {
    async fn insert_application(&self, mut application: Application) -> StoreResult<Application> {
        let mut tables = self.tables.lock().unwrap();
        if tables.applications.iter().any(|a| {
            a.post_id == application.post_id && a.provider_id == application.provider_id
        }) {
            return Err(StoreError::Duplicate);
        }
        application.id = Some(ObjectId::new());
        tables.applications.push(application.clone());
        Ok(application)
    }

    async fn find_application(&self, id: ObjectId) -> StoreResult<Option<Application>> {
        Ok(self.application(id))
    }

    async fn find_application_by(
        &self,
        post_id: ObjectId,
        provider_id: ObjectId,
    ) -> StoreResult<Option<Application>> {
        if self.hiding() {
            return Ok(None);
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .applications
            .iter()
            .find(|a| a.post_id == post_id && a.provider_id == provider_id)
            .cloned())
    }

    async fn applications_for_post(&self, post_id: ObjectId) -> StoreResult<Vec<Application>> {
        let tables = self.tables.lock().unwrap();
        Ok(newest_first(tables.applications.iter().filter(|a| a.post_id == post_id))
            .into_iter()
            .cloned()
            .collect())
    }

    async fn applications_by_provider(&self, provider_id: ObjectId) -> StoreResult<Vec<Application>> {
        let tables = self.tables.lock().unwrap();
        Ok(
            newest_first(tables.applications.iter().filter(|a| a.provider_id == provider_id))
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    async fn find_applications(&self, ids: &[ObjectId]) -> StoreResult<Vec<Application>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .applications
            .iter()
            .filter(|a| a.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn count_applications_for_post(&self, post_id: ObjectId) -> StoreResult<u64> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.applications.iter().filter(|a| a.post_id == post_id).count() as u64)
    }

    async fn set_application_status(
        &self,
        id: ObjectId,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .applications
            .iter_mut()
            .find(|a| a.id == Some(id))
            .map(|application| {
                application.status = status;
                application.updated_at = DateTime::now();
                application.clone()
            }))
    }

    async fn delete_application(&self, id: ObjectId) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.applications.len();
        tables.applications.retain(|a| a.id != Some(id));
        Ok(tables.applications.len() < before)
    }

    async fn delete_applications_for_post(&self, post_id: ObjectId) -> StoreResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.applications.len();
        tables.applications.retain(|a| a.post_id != post_id);
        Ok((before - tables.applications.len()) as u64)
    }
}

#[rocket::async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, mut review: Review) -> StoreResult<Review> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .reviews
            .iter()
            .any(|r| r.application_id == review.application_id)
        {
            return Err(StoreError::Duplicate);
        }
        review.id = Some(ObjectId::new());
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn find_review(&self, id: ObjectId) -> StoreResult<Option<Review>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.reviews.iter().find(|r| r.id == Some(id)).cloned())
    }

    async fn find_review_for_application(&self, application_id: ObjectId) -> StoreResult<Option<Review>> {
        if self.hiding() {
            return Ok(None);
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reviews
            .iter()
            .find(|r| r.application_id == application_id)
            .cloned())
    }

    async fn reviewed_applications(&self, application_ids: &[ObjectId]) -> StoreResult<Vec<ObjectId>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reviews
            .iter()
            .map(|r| r.application_id)
            .filter(|id| application_ids.contains(id))
            .collect())
    }

    async fn reviews_for_provider(&self, provider_id: ObjectId, page: Page) -> StoreResult<(Vec<Review>, u64)> {
        let tables = self.tables.lock().unwrap();
        let matching: Vec<Review> =
            newest_first(tables.reviews.iter().filter(|r| r.provider_id == provider_id))
                .into_iter()
                .cloned()
                .collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn reviews_by_seeker(&self, seeker_id: ObjectId) -> StoreResult<Vec<Review>> {
        let tables = self.tables.lock().unwrap();
        Ok(newest_first(tables.reviews.iter().filter(|r| r.seeker_id == seeker_id))
            .into_iter()
            .cloned()
            .collect())
    }

    async fn delete_review(&self, id: ObjectId) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != Some(id));
        Ok(tables.reviews.len() < before)
    }

    async fn rating_summary(&self, provider_id: ObjectId) -> StoreResult<Option<RatingSummary>> {
        let tables = self.tables.lock().unwrap();
        let ratings: Vec<i32> = tables
            .reviews
            .iter()
            .filter(|r| r.provider_id == provider_id)
            .map(|r| r.rating)
            .collect();
        if ratings.is_empty() {
            return Ok(None);
        }
        let sum: i32 = ratings.iter().sum();
        Ok(Some(RatingSummary {
            average: sum as f64 / ratings.len() as f64,
            count: ratings.len() as i32,
        }))
    }
}

#[rocket::async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: ObjectId) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == Some(id)).cloned())
    }

    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .filter(|u| u.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn set_rating(&self, user_id: ObjectId, average: f64, count: i32) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == Some(user_id)) {
            user.average_rating = average;
            user.review_count = count;
        }
        Ok(())
    }
}

/// Records every notification it is handed.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, target: ObjectId) -> Vec<NotificationKind> {
        self.sent()
            .into_iter()
            .filter(|n| n.target_id == target)
            .map(|n| n.kind)
            .collect()
    }
}

#[rocket::async_trait]
impl NotificationSink for MemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// A notification channel that is always down.
pub struct FailingNotifier;

#[rocket::async_trait]
impl NotificationSink for FailingNotifier {
    async fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".to_string()))
    }
}

/// Every manager wired over one in-memory store.
pub struct Market {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub posts: PostManager,
    pub applications: ApplicationManager,
    pub reviews: ReviewManager,
    pub providers: ProviderDirectory,
}

impl Market {
    pub fn new() -> Self {
        let notifier = Arc::new(MemoryNotifier::default());
        Self::build(notifier.clone(), notifier)
    }

    /// Managers whose notifications all fail to deliver.
    pub fn with_failing_notifier() -> Self {
        Self::build(Arc::new(MemoryNotifier::default()), Arc::new(FailingNotifier))
    }

    fn build(notifier: Arc<MemoryNotifier>, sink: Arc<dyn NotificationSink>) -> Self {
        let store = Arc::new(MemoryStore::default());
        let shared: Arc<dyn MarketStore> = store.clone();
        Market {
            posts: PostManager::new(shared.clone()),
            applications: ApplicationManager::new(shared.clone(), sink.clone()),
            reviews: ReviewManager::new(shared.clone(), sink),
            providers: ProviderDirectory::new(shared),
            store,
            notifier,
        }
    }

    pub fn seeker(&self, name: &str) -> Identity {
        self.store.add_user(name, Role::Seeker)
    }

    pub fn provider(&self, name: &str) -> Identity {
        self.store.add_user(name, Role::Provider)
    }

    pub async fn open_post(&self, owner: &Identity, title: &str) -> ObjectId {
        self.posts
            .create(owner, &post_dto(title))
            .await
            .expect("post created")
            .id
            .expect("post id")
    }

    pub async fn apply(&self, provider: &Identity, post_id: ObjectId) -> ObjectId {
        self.applications
            .create(provider, &application_dto(post_id))
            .await
            .expect("application created")
            .id
            .expect("application id")
    }

    /// Post by `seeker`, application by `provider`, accepted by `seeker`.
    pub async fn accepted_application(&self, seeker: &Identity, provider: &Identity) -> ObjectId {
        let post_id = self.open_post(seeker, "Build a landing page").await;
        let application_id = self.apply(provider, post_id).await;
        self.applications
            .update_status(seeker, &application_id.to_hex(), ApplicationDecision::Accepted)
            .await
            .expect("application accepted");
        application_id
    }

    pub async fn review(&self, seeker: &Identity, application_id: ObjectId, rating: i32) -> ObjectId {
        self.reviews
            .create(seeker, &review_dto(application_id, rating))
            .await
            .expect("review created")
            .id
            .expect("review id")
    }
}

pub fn post_dto(title: &str) -> CreatePostDto {
    CreatePostDto {
        title: title.to_string(),
        description: "Looking for someone to deliver this within two weeks.".to_string(),
        category: PostCategory::WebDevelopment,
        budget: 500.0,
        skills: Vec::new(),
        location: Some(Location {
            city: Some("Lisbon".to_string()),
            country: Some("Portugal".to_string()),
            remote: true,
        }),
        milestones: Vec::new(),
    }
}

pub fn application_dto(post_id: ObjectId) -> CreateApplicationDto {
    CreateApplicationDto {
        post_id: post_id.to_hex(),
        message: "I have 5 years experience in this field".to_string(),
    }
}

pub fn review_dto(application_id: ObjectId, rating: i32) -> CreateReviewDto {
    CreateReviewDto {
        application_id: application_id.to_hex(),
        rating,
        comment: Some("Great work".to_string()),
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use mongodb::bson::{oid::ObjectId, DateTime};

use super::application::unique;
use super::notification::{notify, NotificationSink};
use super::rating::RatingAggregator;
use super::{MarketError, MarketResult};
use crate::db::{MarketStore, StoreError};
use crate::models::{
    ApplicationStatus, CreateReviewDto, Identity, Notification, NotificationKind,
    ProviderReviewView, Review, ReviewResponse, Role, SeekerReviewView,
};
use crate::utils::{parse_object_id, validate_dto, Page, Paginated};

const ALREADY_REVIEWED: &str = "This application has already been reviewed";

/// Review lifecycle. Every create and delete recomputes the provider's rating.
#[derive(Clone)]
pub struct ReviewManager {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn NotificationSink>,
    ratings: RatingAggregator,
}

impl ReviewManager {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        ReviewManager {
            ratings: RatingAggregator::new(store.clone()),
            store,
            notifier,
        }
    }

    pub async fn create(&self, identity: &Identity, dto: &CreateReviewDto) -> MarketResult<Review> {
        if !identity.is(Role::Seeker) {
            return Err(MarketError::forbidden("Only seekers can leave reviews"));
        }
        validate_dto(dto, CreateReviewDto::FIELD_ORDER)?;
        let application_id = parse_object_id(&dto.application_id, "application")?;

        let application = self
            .store
            .find_application(application_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Application not found"))?;

        if application.status != ApplicationStatus::Accepted {
            return Err(MarketError::invalid_state(
                "You can only review accepted applications",
            ));
        }

        let post = self
            .store
            .find_post(application.post_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Post not found"))?;

        if post.owner_id != identity.user_id {
            return Err(MarketError::forbidden(
                "You can only review applications on your own posts",
            ));
        }

        if self
            .store
            .find_review_for_application(application_id)
            .await?
            .is_some()
        {
            return Err(MarketError::conflict(ALREADY_REVIEWED));
        }

        let now = DateTime::now();
        let review = Review {
            id: None,
            seeker_id: identity.user_id,
            provider_id: application.provider_id,
            application_id,
            rating: dto.rating,
            comment: dto
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        let review = match self.store.insert_review(review).await {
            Ok(review) => review,
            Err(StoreError::Duplicate) => return Err(MarketError::conflict(ALREADY_REVIEWED)),
            Err(e) => return Err(e.into()),
        };

        self.ratings.recompute(review.provider_id).await?;

        notify(
            self.notifier.as_ref(),
            Notification::new(
                review.provider_id,
                NotificationKind::NewReview,
                "New review received",
                format!(
                    "You received a {}-star review for \"{}\"",
                    review.rating, post.title
                ),
                format!("/reviews/provider/{}", review.provider_id.to_hex()),
            ),
        )
        .await;

        Ok(review)
    }

    /// Public: reviews naming a provider, newest first, with author names.
    pub async fn list_for_provider(
        &self,
        provider_id: &str,
        page: Page,
    ) -> MarketResult<Paginated<ProviderReviewView>> {
        let provider_id = parse_object_id(provider_id, "provider")?;
        let (reviews, total) = self.store.reviews_for_provider(provider_id, page).await?;

        let seeker_ids = unique(reviews.iter().map(|r| r.seeker_id));
        let seeker_names: HashMap<ObjectId, String> = self
            .store
            .find_users(&seeker_ids)
            .await?
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u.name)))
            .collect();

        let items = reviews
            .into_iter()
            .map(|review| ProviderReviewView {
                seeker_name: seeker_names.get(&review.seeker_id).cloned(),
                review: ReviewResponse::from(review),
            })
            .collect();

        Ok(Paginated {
            items,
            pagination: page.info(total),
        })
    }

    /// Reviews the caller wrote, with the provider's name and the post title.
    pub async fn list_own(&self, identity: &Identity) -> MarketResult<Vec<SeekerReviewView>> {
        if !identity.is(Role::Seeker) {
            return Err(MarketError::forbidden("Only seekers write reviews"));
        }

        let reviews = self.store.reviews_by_seeker(identity.user_id).await?;

        let provider_ids = unique(reviews.iter().map(|r| r.provider_id));
        let provider_names: HashMap<ObjectId, String> = self
            .store
            .find_users(&provider_ids)
            .await?
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u.name)))
            .collect();

        let application_ids = unique(reviews.iter().map(|r| r.application_id));
        let applications = self.store.find_applications(&application_ids).await?;
        let post_of_application: HashMap<ObjectId, ObjectId> = applications
            .iter()
            .filter_map(|a| a.id.map(|id| (id, a.post_id)))
            .collect();

        let post_ids = unique(applications.iter().map(|a| a.post_id));
        let post_titles: HashMap<ObjectId, String> = self
            .store
            .find_posts(&post_ids)
            .await?
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p.title)))
            .collect();

        Ok(reviews
            .into_iter()
            .map(|review| {
                let post_title = post_of_application
                    .get(&review.application_id)
                    .and_then(|post_id| post_titles.get(post_id))
                    .cloned();
                SeekerReviewView {
                    provider_name: provider_names.get(&review.provider_id).cloned(),
                    post_title,
                    review: ReviewResponse::from(review),
                }
            })
            .collect())
    }

    pub async fn delete(&self, identity: &Identity, review_id: &str) -> MarketResult<()> {
        let review_id = parse_object_id(review_id, "review")?;
        let review = self
            .store
            .find_review(review_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Review not found"))?;

        if review.seeker_id != identity.user_id {
            return Err(MarketError::forbidden("You can only delete your own reviews"));
        }

        self.store.delete_review(review_id).await?;
        self.ratings.recompute(review.provider_id).await?;
        Ok(())
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::info;
use mongodb::bson::{oid::ObjectId, DateTime};

use super::notification::{notify, NotificationSink};
use super::{MarketError, MarketResult};
use crate::db::{MarketStore, StoreError};
use crate::models::{
    Application, ApplicationDecision, ApplicationResponse, ApplicationStatus, CreateApplicationDto,
    Identity, Notification, NotificationKind, Post, PostApplicationView, PostStatus, PostSummary,
    ProviderApplicationView, PublicProfile, Role,
};
use crate::utils::{parse_object_id, validate_dto};

const ALREADY_APPLIED: &str = "You have already applied to this post";

/// Application lifecycle: apply, list, decide and withdraw.
#[derive(Clone)]
pub struct ApplicationManager {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ApplicationManager {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        ApplicationManager { store, notifier }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        dto: &CreateApplicationDto,
    ) -> MarketResult<Application> {
        if !identity.is(Role::Provider) {
            return Err(MarketError::forbidden("Only providers can apply to posts"));
        }
        let dto = dto.trimmed();
        validate_dto(&dto, CreateApplicationDto::FIELD_ORDER)?;
        let post_id = parse_object_id(&dto.post_id, "post")?;

        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Post not found"))?;

        if post.status != PostStatus::Open {
            return Err(MarketError::invalid_state(
                "This post is no longer accepting applications",
            ));
        }

        if post.owner_id == identity.user_id {
            return Err(MarketError::forbidden("You cannot apply to your own post"));
        }

        if self
            .store
            .find_application_by(post_id, identity.user_id)
            .await?
            .is_some()
        {
            return Err(MarketError::conflict(ALREADY_APPLIED));
        }

        let now = DateTime::now();
        let application = Application {
            id: None,
            post_id,
            provider_id: identity.user_id,
            message: dto.message,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        // The unique index is the real guard; a concurrent apply lands here.
        let application = match self.store.insert_application(application).await {
            Ok(application) => application,
            Err(StoreError::Duplicate) => return Err(MarketError::conflict(ALREADY_APPLIED)),
            Err(e) => return Err(e.into()),
        };

        notify(
            self.notifier.as_ref(),
            Notification::new(
                post.owner_id,
                NotificationKind::NewApplication,
                "New application received",
                format!("Someone applied to your post \"{}\"", post.title),
                format!("/posts/{}/applications", post_id.to_hex()),
            ),
        )
        .await;

        Ok(application)
    }

    /// A provider's own applications, newest first, with the targeted post.
    pub async fn list_own(&self, identity: &Identity) -> MarketResult<Vec<ProviderApplicationView>> {
        if !identity.is(Role::Provider) {
            return Err(MarketError::forbidden(
                "Seekers list applications per post they own",
            ));
        }

        let applications = self.store.applications_by_provider(identity.user_id).await?;

        let post_ids: Vec<ObjectId> = unique(applications.iter().map(|a| a.post_id));
        let posts: HashMap<ObjectId, Post> = self
            .store
            .find_posts(&post_ids)
            .await?
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect();

        let owner_ids: Vec<ObjectId> = unique(posts.values().map(|p| p.owner_id));
        let owner_names: HashMap<ObjectId, String> = self
            .store
            .find_users(&owner_ids)
            .await?
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u.name)))
            .collect();

        Ok(applications
            .into_iter()
            .map(|application| {
                let post = posts.get(&application.post_id).map(|post| PostSummary {
                    id: application.post_id.to_hex(),
                    title: post.title.clone(),
                    category: post.category,
                    budget: post.budget,
                    status: post.status,
                    owner_name: owner_names.get(&post.owner_id).cloned(),
                });
                ProviderApplicationView {
                    application: ApplicationResponse::from(application),
                    post,
                }
            })
            .collect())
    }

    /// Every application on a post, for that post's owner.
    pub async fn list_for_post(
        &self,
        identity: &Identity,
        post_id: &str,
    ) -> MarketResult<Vec<PostApplicationView>> {
        let post_id = parse_object_id(post_id, "post")?;
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Post not found"))?;

        if post.owner_id != identity.user_id {
            return Err(MarketError::forbidden(
                "Only the post owner can view its applications",
            ));
        }

        let applications = self.store.applications_for_post(post_id).await?;

        let provider_ids: Vec<ObjectId> = unique(applications.iter().map(|a| a.provider_id));
        let providers: HashMap<ObjectId, PublicProfile> = self
            .store
            .find_users(&provider_ids)
            .await?
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, PublicProfile::from(u))))
            .collect();

        let application_ids: Vec<ObjectId> = applications.iter().filter_map(|a| a.id).collect();
        let reviewed: HashSet<ObjectId> = self
            .store
            .reviewed_applications(&application_ids)
            .await?
            .into_iter()
            .collect();

        Ok(applications
            .into_iter()
            .map(|application| {
                let has_review = application
                    .id
                    .map(|id| reviewed.contains(&id))
                    .unwrap_or(false);
                PostApplicationView {
                    provider: providers.get(&application.provider_id).cloned(),
                    has_review,
                    application: ApplicationResponse::from(application),
                }
            })
            .collect())
    }

    /// Accept or reject a pending application. Accepting closes the post;
    /// other applications on it keep their status.
    pub async fn update_status(
        &self,
        identity: &Identity,
        application_id: &str,
        decision: ApplicationDecision,
    ) -> MarketResult<Application> {
        let application_id = parse_object_id(application_id, "application")?;
        let application = self
            .store
            .find_application(application_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Application not found"))?;

        let post = self
            .store
            .find_post(application.post_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Post not found"))?;

        if post.owner_id != identity.user_id {
            return Err(MarketError::forbidden(
                "Only the post owner can update application status",
            ));
        }

        if application.status != ApplicationStatus::Pending {
            return Err(MarketError::invalid_state(format!(
                "Application has already been {}",
                application.status.as_str().to_lowercase()
            )));
        }

        let status = ApplicationStatus::from(decision);
        let updated = self
            .store
            .set_application_status(application_id, status)
            .await?
            .ok_or_else(|| MarketError::not_found("Application not found"))?;

        if status == ApplicationStatus::Accepted {
            self.store
                .set_post_status(application.post_id, PostStatus::Closed)
                .await?;
            info!(
                "Post {} closed after accepting application {}",
                application.post_id, application_id
            );
        }

        let (kind, title, verb) = match status {
            ApplicationStatus::Accepted => (
                NotificationKind::ApplicationAccepted,
                "Application accepted",
                "accepted",
            ),
            _ => (
                NotificationKind::ApplicationRejected,
                "Application rejected",
                "rejected",
            ),
        };

        notify(
            self.notifier.as_ref(),
            Notification::new(
                application.provider_id,
                kind,
                title,
                format!("Your application to \"{}\" was {}", post.title, verb),
                "/applications/mine",
            ),
        )
        .await;

        Ok(updated)
    }

    /// Withdraw one's own application while it is still pending.
    pub async fn withdraw(&self, identity: &Identity, application_id: &str) -> MarketResult<()> {
        let application_id = parse_object_id(application_id, "application")?;
        let application = self
            .store
            .find_application(application_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Application not found"))?;

        if application.provider_id != identity.user_id {
            return Err(MarketError::forbidden(
                "You can only withdraw your own applications",
            ));
        }

        if application.status != ApplicationStatus::Pending {
            return Err(MarketError::invalid_state(
                "Only pending applications can be withdrawn",
            ));
        }

        self.store.delete_application(application_id).await?;
        Ok(())
    }
}

/// Distinct ids, first-seen order.
pub(crate) fn unique(ids: impl Iterator<Item = ObjectId>) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

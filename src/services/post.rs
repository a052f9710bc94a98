use std::sync::Arc;

use log::info;
use mongodb::bson::{oid::ObjectId, DateTime};
use validator::Validate;

use super::{MarketError, MarketResult};
use crate::db::MarketStore;
use crate::models::{
    CreatePostDto, Identity, Milestone, MilestoneDto, Post, PostBrowseQuery, PostChanges,
    PostDetail, PostFilter, PostResponse, PostStatus, Role, UpdatePostDto,
};
use crate::utils::{first_violation, parse_object_id, validate_dto, Page, Paginated};

/// Job posts: owner-gated create/update/delete plus public reads.
#[derive(Clone)]
pub struct PostManager {
    store: Arc<dyn MarketStore>,
}

impl PostManager {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        PostManager { store }
    }

    pub async fn create(&self, identity: &Identity, dto: &CreatePostDto) -> MarketResult<Post> {
        if !identity.is(Role::Seeker) {
            return Err(MarketError::forbidden("Only seekers can create posts"));
        }
        let dto = dto.trimmed();
        validate_dto(&dto, CreatePostDto::FIELD_ORDER)?;

        let now = DateTime::now();
        let post = Post {
            id: None,
            owner_id: identity.user_id,
            title: dto.title.clone(),
            description: dto.description.clone(),
            category: dto.category,
            budget: dto.budget,
            status: PostStatus::Open,
            skills: parse_skills(&dto.skills)?,
            location: dto.location.clone(),
            milestones: dto.milestones.iter().map(Milestone::from).collect(),
            created_at: now,
            updated_at: now,
        };

        Ok(self.store.insert_post(post).await?)
    }

    pub async fn get(&self, post_id: &str) -> MarketResult<PostDetail> {
        let post_id = parse_object_id(post_id, "post")?;
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Post not found"))?;

        self.detail(post).await
    }

    pub async fn browse(&self, query: &PostBrowseQuery) -> MarketResult<Paginated<PostResponse>> {
        let page = Page::new(query.page, query.limit);
        let filter = PostFilter {
            category: query.category,
            status: Some(query.status.unwrap_or(PostStatus::Open)),
            remote: query.remote,
            search: query.search.clone(),
        };

        let (posts, total) = self.store.browse_posts(&filter, page).await?;

        Ok(Paginated {
            items: posts.into_iter().map(PostResponse::from).collect(),
            pagination: page.info(total),
        })
    }

    /// The caller's own posts, newest first, with application counts.
    pub async fn list_own(&self, identity: &Identity) -> MarketResult<Vec<PostDetail>> {
        let posts = self.store.posts_by_owner(identity.user_id).await?;

        let mut details = Vec::with_capacity(posts.len());
        for post in posts {
            details.push(self.detail(post).await?);
        }
        Ok(details)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        post_id: &str,
        dto: &UpdatePostDto,
    ) -> MarketResult<Post> {
        let post_id = parse_object_id(post_id, "post")?;
        let post = self.owned_post(identity, post_id, "update").await?;

        let dto = dto.trimmed();
        validate_dto(&dto, UpdatePostDto::FIELD_ORDER)?;
        if let Some(ref milestones) = dto.milestones {
            validate_milestones(milestones)?;
        }

        let changes = PostChanges {
            title: dto.title.clone(),
            description: dto.description.clone(),
            category: dto.category,
            budget: dto.budget,
            status: dto.status,
            skills: dto.skills.as_deref().map(parse_skills).transpose()?,
            location: dto.location.clone(),
            milestones: dto
                .milestones
                .as_ref()
                .map(|m| m.iter().map(Milestone::from).collect()),
        };

        if changes.status.is_some_and(|status| status != post.status) {
            info!(
                "Post {} status changed by owner: {} -> {}",
                post_id,
                post.status.as_str(),
                changes.status.map(|s| s.as_str()).unwrap_or_default()
            );
        }

        self.store
            .update_post(post_id, &changes)
            .await?
            .ok_or_else(|| MarketError::not_found("Post not found"))
    }

    /// Deletes the post and every application on it. Returns how many
    /// applications were removed.
    pub async fn delete(&self, identity: &Identity, post_id: &str) -> MarketResult<u64> {
        let post_id = parse_object_id(post_id, "post")?;
        self.owned_post(identity, post_id, "delete").await?;

        let removed = self.store.delete_applications_for_post(post_id).await?;
        self.store.delete_post(post_id).await?;

        info!("Post {} deleted with {} application(s)", post_id, removed);
        Ok(removed)
    }

    async fn owned_post(&self, identity: &Identity, post_id: ObjectId, action: &str) -> MarketResult<Post> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Post not found"))?;

        if post.owner_id != identity.user_id {
            return Err(MarketError::forbidden(format!(
                "Only the post owner can {} it",
                action
            )));
        }
        Ok(post)
    }

    async fn detail(&self, post: Post) -> MarketResult<PostDetail> {
        let application_count = match post.id {
            Some(id) => self.store.count_applications_for_post(id).await?,
            None => 0,
        };
        let owner_name = self.store.find_user(post.owner_id).await?.map(|u| u.name);

        Ok(PostDetail {
            post: PostResponse::from(post),
            owner_name,
            application_count,
        })
    }
}

fn parse_skills(raw: &[String]) -> MarketResult<Vec<ObjectId>> {
    let mut skills = Vec::with_capacity(raw.len());
    for id in raw {
        let skill = parse_object_id(id, "skill")?;
        if !skills.contains(&skill) {
            skills.push(skill);
        }
    }
    Ok(skills)
}

fn validate_milestones(milestones: &[MilestoneDto]) -> MarketResult<()> {
    for milestone in milestones {
        milestone
            .validate()
            .map_err(|errors| MarketError::ValidationFailed(first_violation(&errors, &["title", "amount"])))?;
    }
    Ok(())
}

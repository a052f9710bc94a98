use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::guards::AuthGuard;
use crate::models::{CreatePostDto, PostBrowseQuery, PostDetail, PostResponse, UpdatePostDto};
use crate::services::PostManager;
use crate::utils::{ApiError, ApiResponse, Paginated};

#[openapi(tag = "Post")]
#[post("/posts", data = "<dto>")]
pub async fn create_post(
    posts: &State<PostManager>,
    auth: AuthGuard,
    dto: Json<CreatePostDto>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let post = posts.create(&auth.identity, &dto).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Post created successfully",
        PostResponse::from(post),
    )))
}

#[openapi(tag = "Post")]
#[get("/posts?<query..>")]
pub async fn browse_posts(
    posts: &State<PostManager>,
    query: PostBrowseQuery,
) -> Result<Json<ApiResponse<Paginated<PostResponse>>>, ApiError> {
    Ok(Json(ApiResponse::success(posts.browse(&query).await?)))
}

#[openapi(tag = "Post")]
#[get("/posts/mine")]
pub async fn get_my_posts(
    posts: &State<PostManager>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<Vec<PostDetail>>>, ApiError> {
    Ok(Json(ApiResponse::success(posts.list_own(&auth.identity).await?)))
}

#[openapi(tag = "Post")]
#[get("/posts/<post_id>")]
pub async fn get_post(
    posts: &State<PostManager>,
    post_id: String,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    Ok(Json(ApiResponse::success(posts.get(&post_id).await?)))
}

#[openapi(tag = "Post")]
#[put("/posts/<post_id>", data = "<dto>")]
pub async fn update_post(
    posts: &State<PostManager>,
    auth: AuthGuard,
    post_id: String,
    dto: Json<UpdatePostDto>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let post = posts.update(&auth.identity, &post_id, &dto).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Post updated successfully",
        PostResponse::from(post),
    )))
}

#[openapi(tag = "Post")]
#[delete("/posts/<post_id>")]
pub async fn delete_post(
    posts: &State<PostManager>,
    auth: AuthGuard,
    post_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let removed = posts.delete(&auth.identity, &post_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Post deleted successfully",
        serde_json::json!({
            "applications_removed": removed
        }),
    )))
}

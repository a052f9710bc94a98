use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::guards::AuthGuard;
use crate::models::{
    CreateReviewDto, ProviderReviewView, ProviderReviewsQuery, ReviewResponse, SeekerReviewView,
};
use crate::services::ReviewManager;
use crate::utils::{ApiError, ApiResponse, Page, Paginated};

#[openapi(tag = "Review")]
#[post("/reviews", data = "<dto>")]
pub async fn create_review(
    reviews: &State<ReviewManager>,
    auth: AuthGuard,
    dto: Json<CreateReviewDto>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let review = reviews.create(&auth.identity, &dto).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Review submitted successfully",
        ReviewResponse::from(review),
    )))
}

#[openapi(tag = "Review")]
#[get("/reviews/provider/<provider_id>?<query..>")]
pub async fn get_provider_reviews(
    reviews: &State<ReviewManager>,
    provider_id: String,
    query: ProviderReviewsQuery,
) -> Result<Json<ApiResponse<Paginated<ProviderReviewView>>>, ApiError> {
    let page = Page::new(query.page, query.limit);

    Ok(Json(ApiResponse::success(
        reviews.list_for_provider(&provider_id, page).await?,
    )))
}

#[openapi(tag = "Review")]
#[get("/reviews/mine")]
pub async fn get_my_reviews(
    reviews: &State<ReviewManager>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<Vec<SeekerReviewView>>>, ApiError> {
    Ok(Json(ApiResponse::success(reviews.list_own(&auth.identity).await?)))
}

#[openapi(tag = "Review")]
#[delete("/reviews/<review_id>")]
pub async fn delete_review(
    reviews: &State<ReviewManager>,
    auth: AuthGuard,
    review_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    reviews.delete(&auth.identity, &review_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Review deleted successfully"
    }))))
}

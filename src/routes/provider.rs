use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::models::PublicProfile;
use crate::services::ProviderDirectory;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Provider")]
#[get("/providers/<provider_id>")]
pub async fn get_provider_profile(
    providers: &State<ProviderDirectory>,
    provider_id: String,
) -> Result<Json<ApiResponse<PublicProfile>>, ApiError> {
    Ok(Json(ApiResponse::success(providers.profile(&provider_id).await?)))
}

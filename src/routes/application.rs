use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::guards::AuthGuard;
use crate::models::{
    ApplicationResponse, CreateApplicationDto, PostApplicationView, ProviderApplicationView,
    UpdateApplicationStatusDto,
};
use crate::services::ApplicationManager;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Application")]
#[post("/applications", data = "<dto>")]
pub async fn create_application(
    applications: &State<ApplicationManager>,
    auth: AuthGuard,
    dto: Json<CreateApplicationDto>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let application = applications.create(&auth.identity, &dto).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Application submitted successfully",
        ApplicationResponse::from(application),
    )))
}

#[openapi(tag = "Application")]
#[get("/applications/mine")]
pub async fn get_my_applications(
    applications: &State<ApplicationManager>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<Vec<ProviderApplicationView>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        applications.list_own(&auth.identity).await?,
    )))
}

#[openapi(tag = "Application")]
#[get("/posts/<post_id>/applications")]
pub async fn get_post_applications(
    applications: &State<ApplicationManager>,
    auth: AuthGuard,
    post_id: String,
) -> Result<Json<ApiResponse<Vec<PostApplicationView>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        applications.list_for_post(&auth.identity, &post_id).await?,
    )))
}

#[openapi(tag = "Application")]
#[put("/applications/<application_id>/status", data = "<dto>")]
pub async fn update_application_status(
    applications: &State<ApplicationManager>,
    auth: AuthGuard,
    application_id: String,
    dto: Json<UpdateApplicationStatusDto>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let application = applications
        .update_status(&auth.identity, &application_id, dto.status)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        format!("Application {}", application.status.as_str().to_lowercase()),
        ApplicationResponse::from(application),
    )))
}

#[openapi(tag = "Application")]
#[delete("/applications/<application_id>")]
pub async fn withdraw_application(
    applications: &State<ApplicationManager>,
    auth: AuthGuard,
    application_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    applications.withdraw(&auth.identity, &application_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Application withdrawn successfully"
    }))))
}

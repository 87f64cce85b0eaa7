use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::app::AppState;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ApplicationForm, ContactForm, IntakeService, Submitted};

/// POST /api/public/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    body: Result<Json<ContactForm>, JsonRejection>,
) -> ApiResult<Submitted> {
    let form = json_body(body)?;
    let submitted = IntakeService::new(state.pool.clone()).submit_contact(form).await?;

    Ok(ApiResponse::created(submitted).with_message("Thanks, we will be in touch soon"))
}

/// POST /api/public/applications
pub async fn submit_application(
    State(state): State<AppState>,
    body: Result<Json<ApplicationForm>, JsonRejection>,
) -> ApiResult<Submitted> {
    let form = json_body(body)?;
    let submitted = IntakeService::new(state.pool.clone()).submit_application(form).await?;

    Ok(ApiResponse::created(submitted).with_message("Application received"))
}

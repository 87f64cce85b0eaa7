use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Principal;

/// GET /api/admin/me - the principal resolved for this request
pub async fn me(Extension(principal): Extension<Principal>) -> ApiResult<Principal> {
    Ok(ApiResponse::success(principal))
}

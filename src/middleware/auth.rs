use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;

/// Verify the bearer credential against live account state and attach the
/// resolved [`Principal`](crate::types::Principal) to the request
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = state.verifier.verify(request.headers()).await?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Same checks as [`require_admin`], then demand the super-admin tier
pub async fn require_super_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = state.super_admin.check(request.headers()).await?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

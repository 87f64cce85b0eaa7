use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use crate::app::AppState;
use crate::error::ApiError;
use crate::ratelimit::RateLimitPolicy;

pub async fn limit_contact(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let policy = RateLimitPolicy::contact(&state.config.rate_limit);
    enforce(&state, &policy, request, next).await
}

pub async fn limit_applications(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let policy = RateLimitPolicy::application(&state.config.rate_limit);
    enforce(&state, &policy, request, next).await
}

async fn enforce(
    state: &AppState,
    policy: &RateLimitPolicy,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    state.limiter.check(policy, request.headers(), peer).await?;
    Ok(next.run(request).await)
}

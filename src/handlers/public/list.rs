use axum::extract::{Path, Query, State};
use std::collections::HashMap;
use std::str::FromStr;

use crate::app::AppState;
use crate::database::{query_builder, Resource};
use crate::error::ApiError;
use crate::filter::{params::parse_list_query, ListFilter};
use crate::middleware::ListResponse;
use serde_json::Value;

/// GET /api/public/:resource - published rows only
pub async fn list_public(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<ListResponse<Value>, ApiError> {
    let resource = Resource::from_str(&resource)
        .ok()
        .filter(|r| r.is_public())
        .ok_or_else(|| ApiError::not_found(format!("Unknown resource '{}'", resource)))?;

    let query = parse_list_query(&raw, resource.spec(), &state.config.list)?;
    let filter = ListFilter::new(resource, query).public_only();
    let page = query_builder::fetch_page(&state.pool, &filter).await?;

    Ok(ListResponse::from(page))
}

use axum::extract::{Query, State};
use serde_json::Value;
use std::collections::HashMap;

use crate::app::AppState;
use crate::database::{query_builder, Resource};
use crate::error::ApiError;
use crate::filter::{params::parse_list_query, ListFilter};
use crate::middleware::ListResponse;

/// GET /api/admin/audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<ListResponse<Value>, ApiError> {
    let query = parse_list_query(&raw, Resource::AuditLogs.spec(), &state.config.list)?;
    let filter = ListFilter::new(Resource::AuditLogs, query);
    let page = query_builder::fetch_page(&state.pool, &filter).await?;

    Ok(ListResponse::from(page))
}

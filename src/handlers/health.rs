use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::AppState;
use crate::database::DatabaseManager;

/// GET /health - database ping plus fast store status
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let fast_store = state.fast_store.status();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "fastStore": fast_store
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": {
                        "code": "DB_UNAVAILABLE",
                        "message": "Database unavailable"
                    },
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "fastStore": fast_store
                    }
                })),
            )
        }
    }
}

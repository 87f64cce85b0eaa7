use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::filter::{ListPage, Pagination};

/// Wrapper for API responses that automatically adds the success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: Option<String>,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: None,
            status_code: None,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            data,
            message: None,
            status_code: Some(StatusCode::CREATED),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => return serialization_failure(e),
        };

        let mut envelope = json!({
            "success": true,
            "data": data_value
        });
        if let Some(message) = self.message {
            envelope["message"] = Value::String(message);
        }

        (status, Json(envelope)).into_response()
    }
}

/// `{ success: true, data: [...], pagination: {...} }`
#[derive(Debug)]
pub struct ListResponse<T: Serialize> {
    pub rows: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> From<ListPage<T>> for ListResponse<T> {
    fn from(page: ListPage<T>) -> Self {
        Self {
            rows: page.rows,
            pagination: page.pagination,
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        let rows = match serde_json::to_value(&self.rows) {
            Ok(value) => value,
            Err(e) => return serialization_failure(e),
        };

        Json(json!({
            "success": true,
            "data": rows,
            "pagination": self.pagination,
        }))
        .into_response()
    }
}

fn serialization_failure(e: serde_json::Error) -> Response {
    tracing::error!("Failed to serialize response data: {}", e);
    crate::error::ApiError::internal_error("Failed to serialize response data").into_response()
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_envelope_with_optional_message() {
        let plain = ApiResponse::success(json!({"id": 1})).into_response();
        assert_eq!(plain.status(), StatusCode::OK);
        let body = body_json(plain).await;
        assert_eq!(body, json!({"success": true, "data": {"id": 1}}));

        let created = ApiResponse::created(json!({"id": 2}))
            .with_message("Announcement created")
            .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = body_json(created).await;
        assert_eq!(body["message"], "Announcement created");
    }

    #[tokio::test]
    async fn list_envelope_carries_pagination() {
        let page = ListPage {
            rows: vec![json!({"id": 1}), json!({"id": 2})],
            pagination: Pagination::new(1, 10, 23),
        };
        let body = body_json(ListResponse::from(page).into_response()).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            body["pagination"],
            json!({"page": 1, "limit": 10, "total": 23, "totalPages": 3})
        );
    }
}

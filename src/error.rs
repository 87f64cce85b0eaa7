// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::DatabaseError;
use crate::filter::FilterError;

/// Every failure the core can surface to a client, each with a stable code
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 401 Unauthorized
    Unauthorized(String),
    TokenExpired(String),
    TokenInvalid(String),
    UserNotFound(String),

    // 403 Forbidden
    UserInactive(String),
    Forbidden(String),

    // 429 Too Many Requests
    RateLimited { message: String, retry_after_secs: u64 },

    // 400 Bad Request
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 404 Not Found
    NotFound(String),

    // 409 Conflict, with a domain-specific code such as ALREADY_READ
    Conflict { code: &'static str, message: String },

    // 503 Service Unavailable
    DbUnavailable(String),

    // 500 Internal Server Error
    InternalError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_)
            | ApiError::TokenExpired(_)
            | ApiError::TokenInvalid(_)
            | ApiError::UserNotFound(_) => StatusCode::UNAUTHORIZED,
            ApiError::UserInactive(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DbUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(msg)
            | ApiError::TokenExpired(msg)
            | ApiError::TokenInvalid(msg)
            | ApiError::UserNotFound(msg)
            | ApiError::UserInactive(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::DbUnavailable(msg)
            | ApiError::InternalError(msg) => msg,
            ApiError::RateLimited { message, .. } => message,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Conflict { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::TokenExpired(_) => "TOKEN_EXPIRED",
            ApiError::TokenInvalid(_) => "TOKEN_INVALID",
            ApiError::UserNotFound(_) => "USER_NOT_FOUND",
            ApiError::UserInactive(_) => "USER_INACTIVE",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { code, .. } => *code,
            ApiError::DbUnavailable(_) => "DB_UNAVAILABLE",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to the `{ success: false, error: { code, message, details? } }` envelope
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "code": self.error_code(),
            "message": self.message(),
        });

        match self {
            ApiError::ValidationError { field_errors: Some(fields), .. } => {
                error["details"] = json!(fields);
            }
            ApiError::RateLimited { retry_after_secs, .. } => {
                error["details"] = json!({ "retryAfter": retry_after_secs });
            }
            _ => {}
        }

        json!({ "success": false, "error": error })
    }
}

// Static constructor methods
impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn token_expired(message: impl Into<String>) -> Self {
        ApiError::TokenExpired(message.into())
    }

    pub fn token_invalid(message: impl Into<String>) -> Self {
        ApiError::TokenInvalid(message.into())
    }

    pub fn user_not_found(message: impl Into<String>) -> Self {
        ApiError::UserNotFound(message.into())
    }

    pub fn user_inactive(message: impl Into<String>) -> Self {
        ApiError::UserInactive(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        ApiError::RateLimited {
            message: message.into(),
            retry_after_secs,
        }
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.into());
        ApiError::validation_error("Validation failed", Some(field_errors))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn db_unavailable(message: impl Into<String>) -> Self {
        ApiError::DbUnavailable(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        ApiError::InternalError(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::UniqueViolation { field, constraint } => {
                let field = field.or(constraint).unwrap_or_else(|| "value".to_string());
                ApiError::invalid_field(field, "Value already exists")
            }
            DatabaseError::ForeignKeyViolation { field, constraint } => {
                let field = field.or(constraint).unwrap_or_else(|| "reference".to_string());
                ApiError::invalid_field(field, "Referenced record does not exist")
            }
            DatabaseError::CheckViolation { constraint } => {
                let field = constraint.unwrap_or_else(|| "value".to_string());
                ApiError::invalid_field(field, "Value is not allowed")
            }
            DatabaseError::NotNullViolation { field } => {
                let field = field.unwrap_or_else(|| "value".to_string());
                ApiError::invalid_field(field, "This field is required")
            }
            DatabaseError::InvalidInput(msg) => ApiError::validation_error(msg, None),
            DatabaseError::Unavailable(msg) => {
                tracing::error!("Database unavailable: {}", msg);
                ApiError::db_unavailable("Database temporarily unavailable")
            }
            DatabaseError::ConfigMissing(name) => {
                tracing::error!("Database misconfigured: {} is not set", name);
                ApiError::internal_error("Service is misconfigured")
            }
            DatabaseError::Query(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidParams(fields) => {
                ApiError::validation_error("Invalid list parameters", Some(fields))
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code(), Json(self.to_json())).into_response();

        if let ApiError::RateLimited { retry_after_secs, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

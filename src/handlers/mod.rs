// handlers/mod.rs - 3-tier handler architecture
//
// Public (no auth, rate-limited writes) → Protected (admin credential)
// → Elevated (super-admin credential)
pub mod public;
pub mod protected;
pub mod elevated;
pub mod health;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::ApiError;

/// Unwrap a JSON body, turning extractor rejections into the error envelope
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::validation_error("Request body must be valid JSON", None)
    })
}

/// Parse a numeric path id
pub fn path_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::invalid_field("id", "id must be a positive integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ids_must_be_positive_integers() {
        assert_eq!(path_id("42").unwrap(), 42);
        assert!(path_id("0").is_err());
        assert!(path_id("abc").is_err());
        assert!(path_id("1; DROP TABLE users").is_err());
    }
}

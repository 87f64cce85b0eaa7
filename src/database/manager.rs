use sqlx::{
    postgres::{PgDatabaseError, PgPoolOptions},
    PgPool,
};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Storage failures, classified once from the driver's error codes
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated ({constraint:?})")]
    UniqueViolation {
        field: Option<String>,
        constraint: Option<String>,
    },

    #[error("Foreign key constraint violated ({constraint:?})")]
    ForeignKeyViolation {
        field: Option<String>,
        constraint: Option<String>,
    },

    #[error("Check constraint violated ({constraint:?})")]
    CheckViolation { constraint: Option<String> },

    #[error("Not-null constraint violated ({field:?})")]
    NotNullViolation { field: Option<String> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DatabaseError::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                let pg = db_err.try_downcast_ref::<PgDatabaseError>();
                let column = pg.and_then(|e| e.column()).map(str::to_string);
                let detail = pg.and_then(|e| e.detail());
                classify_sqlstate(
                    db_err.code().as_deref().unwrap_or(""),
                    column.or_else(|| detail.and_then(key_column_from_detail)),
                    db_err.constraint().map(str::to_string),
                    db_err.message(),
                )
            }
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

/// Map a Postgres SQLSTATE to the storage error taxonomy.
pub fn classify_sqlstate(
    code: &str,
    field: Option<String>,
    constraint: Option<String>,
    message: &str,
) -> DatabaseError {
    match code {
        "23505" => DatabaseError::UniqueViolation { field, constraint },
        "23503" => DatabaseError::ForeignKeyViolation { field, constraint },
        "23514" => DatabaseError::CheckViolation { constraint },
        "23502" => DatabaseError::NotNullViolation { field },
        // invalid_text_representation, numeric_value_out_of_range, datetime format/overflow
        "22P02" | "22003" | "22007" | "22008" => DatabaseError::InvalidInput(message.to_string()),
        // too_many_connections, admin/crash shutdown, cannot_connect_now
        "53300" | "57P01" | "57P02" | "57P03" => DatabaseError::Unavailable(message.to_string()),
        c if c.starts_with("08") => DatabaseError::Unavailable(message.to_string()),
        _ => DatabaseError::Query(message.to_string()),
    }
}

/// Extract the column from a detail line such as `Key (email)=(a@b.c) already exists.`
pub fn key_column_from_detail(detail: &str) -> Option<String> {
    let rest = detail.strip_prefix("Key (")?;
    let end = rest.find(')')?;
    let column = &rest[..end];
    // Composite keys are reported as "a, b"; keep the first column for the field map
    column.split(',').next().map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// Connection pool construction and maintenance for the system of record
pub struct DatabaseManager;

impl DatabaseManager {
    /// Build the shared pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await?;

        info!("Connected database pool to {}", Self::redact(url));
        Ok(pool)
    }

    /// Apply embedded migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| DatabaseError::Query(format!("migration failed: {}", e)))?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Strip credentials from a connection URL for logging
    pub fn redact(raw: &str) -> String {
        match url::Url::parse(raw) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}

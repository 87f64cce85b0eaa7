use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::models::AccountRecord;
use crate::database::DatabaseError;

/// Lookup of the current account state behind a token subject
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// The live (not soft-deleted) account for `id`, if any
    async fn find_account(&self, id: i64) -> Result<Option<AccountRecord>, DatabaseError>;
}

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_account(&self, id: i64) -> Result<Option<AccountRecord>, DatabaseError> {
        let account = sqlx::query_as::<_, AccountRecord>(
            "SELECT id, role, is_active
             FROM users
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}

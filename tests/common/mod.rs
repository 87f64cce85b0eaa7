#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tower::ServiceExt;

use backoffice_api::auth::{generate_jwt, AccountStore, Claims};
use backoffice_api::config::AppConfig;
use backoffice_api::database::models::AccountRecord;
use backoffice_api::database::{DatabaseError, DatabaseManager};
use backoffice_api::ratelimit::{CounterStore, FastStore, StoreError};
use backoffice_api::types::Role;
use backoffice_api::{router, AppState};

pub const SECRET: &str = "integration-test-secret";

/// Serializes DB-backed tests within one test binary; admin fan-out counts every admin row
static DB_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = Some(SECRET.to_string());
    config.server.cors_origins = Vec::new();
    config
}

pub fn token(user_id: i64, claimed: Option<Role>) -> String {
    generate_jwt(SECRET, &Claims::new(user_id, claimed, chrono::Duration::hours(1)))
        .expect("token generation")
}

pub fn expired_token(user_id: i64) -> String {
    generate_jwt(SECRET, &Claims::new(user_id, None, chrono::Duration::hours(-2)))
        .expect("token generation")
}

/// A pool that never connects successfully, for routes that must fail before storage
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy("postgres://nobody@127.0.0.1:1/none")
        .expect("lazy pool")
}

/// In-memory account table for router tests that do not need Postgres
#[derive(Default)]
pub struct StubAccounts {
    rows: Mutex<HashMap<i64, AccountRecord>>,
}

impl StubAccounts {
    pub fn with(rows: &[(i64, &str, bool)]) -> Arc<Self> {
        let stub = Self::default();
        {
            let mut map = stub.rows.lock().unwrap();
            for (id, role, active) in rows {
                map.insert(*id, AccountRecord { id: *id, role: role.to_string(), is_active: *active });
            }
        }
        Arc::new(stub)
    }
}

#[async_trait]
impl AccountStore for StubAccounts {
    async fn find_account(&self, id: i64) -> Result<Option<AccountRecord>, DatabaseError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }
}

/// Counter store kept in process memory
#[derive(Default)]
pub struct MemoryCounters {
    counts: Mutex<HashMap<String, u64>>,
    expiries: Mutex<HashMap<String, u64>>,
}

#[async_trait]
impl CounterStore for MemoryCounters {
    async fn incr(&self, key: &str) -> Result<u64, StoreError> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn expire(&self, key: &str, secs: u64) -> Result<(), StoreError> {
        self.expiries.lock().unwrap().insert(key.to_string(), secs);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.expiries.lock().unwrap().get(key).copied())
    }
}

/// Router over stubbed accounts and an unreachable database
pub fn stub_app(accounts: Arc<StubAccounts>, fast_store: FastStore, config: AppConfig) -> Router {
    router(AppState::with_accounts(
        config,
        unreachable_pool(),
        Arc::new(fast_store),
        accounts,
    ))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body for {}", uri))?
    };

    Ok(TestResponse { status, headers, body })
}

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

/// Migrated, emptied database from TEST_DATABASE_URL.
///
/// Database tests are `#[ignore]`d; run them with
/// `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
pub async fn test_db() -> Result<TestDb> {
    let url = std::env::var("TEST_DATABASE_URL").context("TEST_DATABASE_URL must point at a scratch database")?;

    let guard = DB_LOCK.lock().await;
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await?;
    DatabaseManager::migrate(&pool).await?;
    sqlx::query(
        "TRUNCATE notifications, audit_logs, applications, contact_submissions,
                  announcements, events, cohorts, programs, users
         RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(TestDb { pool, _guard: guard })
}

pub async fn insert_user(pool: &PgPool, email: &str, role: &str) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO users (email, full_name, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(email)
    .bind(email.split('@').next().unwrap_or(email))
    .bind(role)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn count(pool: &PgPool, sql: &str) -> Result<i64> {
    Ok(sqlx::query_scalar(sql).fetch_one(pool).await?)
}

/// Full router over a real database
pub fn db_app(pool: PgPool) -> Router {
    router(AppState::new(test_config(), pool, Arc::new(FastStore::absent())))
}

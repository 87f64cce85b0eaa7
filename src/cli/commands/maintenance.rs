use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::auth::{generate_jwt, AccountStore, Claims, PgAccountStore};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::NotificationService;
use crate::types::Role;

pub async fn migrate(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "success": true, "migrated": true })),
        OutputFormat::Text => println!("Migrations applied"),
    }
    Ok(())
}

/// Tokens are only minted for accounts the verifier would accept right now
pub async fn issue_token(
    config: &AppConfig,
    user_id: i64,
    hours: Option<u64>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let secret = config
        .security
        .jwt_secret
        .as_deref()
        .context("JWT_SECRET must be set to issue tokens")?;

    let pool = DatabaseManager::connect(&config.database).await?;
    let account = PgAccountStore::new(pool)
        .find_account(user_id)
        .await?
        .with_context(|| format!("user {} not found", user_id))?;
    if !account.is_active {
        bail!("user {} is inactive", user_id);
    }
    let Some(role) = Role::from_db(&account.role) else {
        bail!("user {} has role '{}', which cannot use the back office", user_id, account.role);
    };

    let hours = hours.unwrap_or(config.security.jwt_expiry_hours);
    let ttl = token_ttl(hours)?;
    let token = generate_jwt(secret, &Claims::new(user_id, Some(role), ttl))?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "token": token, "userId": user_id, "role": role, "expiresInHours": hours })
        ),
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}

/// Token lifetime in hours, rejected when the expiry would not fit a timestamp
fn token_ttl(hours: u64) -> anyhow::Result<Duration> {
    let ttl = i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .with_context(|| format!("--hours {} is out of range", hours))?;
    Utc::now()
        .checked_add_signed(ttl)
        .with_context(|| format!("--hours {} is out of range", hours))?;
    Ok(ttl)
}

pub async fn purge_notifications(
    config: &AppConfig,
    older_than_days: u32,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    let purged = NotificationService::new(pool).purge_read(older_than_days).await?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "purged": purged, "olderThanDays": older_than_days })),
        OutputFormat::Text => println!("Purged {} read notifications", purged),
    }
    Ok(())
}

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AccessGate, AccountStore, CredentialVerifier, PgAccountStore};
use crate::config::AppConfig;
use crate::handlers::{self, elevated, protected, public};
use crate::middleware::{limit_applications, limit_contact, require_admin, require_super_admin};
use crate::ratelimit::{FastStore, RateLimiter};

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub verifier: CredentialVerifier,
    pub super_admin: AccessGate,
    pub limiter: RateLimiter,
    pub fast_store: Arc<FastStore>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool, fast_store: Arc<FastStore>) -> Self {
        let accounts = Arc::new(PgAccountStore::new(pool.clone()));
        Self::with_accounts(config, pool, fast_store, accounts)
    }

    /// Build state around a specific account lookup (tests use an in-memory one)
    pub fn with_accounts(
        config: AppConfig,
        pool: PgPool,
        fast_store: Arc<FastStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        let verifier = CredentialVerifier::new(config.security.jwt_secret.clone(), accounts);
        let super_admin = AccessGate::super_admin(verifier.clone());
        let limiter = RateLimiter::new(fast_store.clone(), config.server.trust_proxy);

        Self {
            config: Arc::new(config),
            pool,
            verifier,
            super_admin,
            limiter,
            fast_store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(public_routes(&state))
        .merge(protected_routes(&state))
        .merge(elevated_routes(&state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes(state: &AppState) -> Router<AppState> {
    let contact = Router::new()
        .route("/api/public/contact", post(public::submit_contact))
        .route_layer(from_fn_with_state(state.clone(), limit_contact));

    let applications = Router::new()
        .route("/api/public/applications", post(public::submit_application))
        .route_layer(from_fn_with_state(state.clone(), limit_applications));

    Router::new()
        .route("/api/public/:resource", get(public::list_public))
        .merge(contact)
        .merge(applications)
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use protected::{announcements, notifications, users};

    Router::new()
        .route("/api/admin/me", get(protected::me))
        .route("/api/admin/users/:id/status", patch(users::set_status))
        .route("/api/admin/announcements", post(announcements::create))
        .route("/api/admin/announcements/:id", delete(announcements::delete))
        .route("/api/admin/notifications", get(notifications::list))
        .route("/api/admin/notifications/unread-count", get(notifications::unread_count))
        .route("/api/admin/notifications/read-all", patch(notifications::mark_all_read))
        .route("/api/admin/notifications/read", delete(notifications::delete_read))
        .route("/api/admin/notifications/:id/read", patch(notifications::mark_read))
        .route("/api/admin/:resource", get(protected::list_admin))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

fn elevated_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/users/:id/role", patch(elevated::set_role))
        .route("/api/admin/audit-logs", get(elevated::list_audit_logs))
        .route_layer(from_fn_with_state(state.clone(), require_super_admin))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

pub mod redis_store;
pub mod store;

pub use store::{CounterStore, FastStore, StoreError, StoreSettings};

use axum::http::HeaderMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// Derives a caller identity from request headers; `None` falls back to network origin
pub type IdentityFn = fn(&HeaderMap) -> Option<String>;

/// Per-call-site limiter settings
#[derive(Clone)]
pub struct RateLimitPolicy {
    pub scope: &'static str,
    pub window_secs: u64,
    pub max_requests: u64,
    pub identity: Option<IdentityFn>,
}

impl RateLimitPolicy {
    pub fn new(scope: &'static str, window_secs: u64, max_requests: u64) -> Self {
        Self {
            scope,
            window_secs,
            max_requests,
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: IdentityFn) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn contact(config: &RateLimitConfig) -> Self {
        Self::new("contact", config.contact_window_secs, config.contact_max_requests)
    }

    pub fn application(config: &RateLimitConfig) -> Self {
        Self::new(
            "application",
            config.application_window_secs,
            config.application_max_requests,
        )
    }
}

/// Fixed-window request counter in the fast store.
///
/// Only a deliberate over-limit decision is ever returned as an error; every
/// store problem degrades to allowing the request.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<FastStore>,
    trust_proxy: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<FastStore>, trust_proxy: bool) -> Self {
        Self { store, trust_proxy }
    }

    pub async fn check(
        &self,
        policy: &RateLimitPolicy,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Result<(), ApiError> {
        let identity = policy
            .identity
            .and_then(|f| f(headers))
            .unwrap_or_else(|| network_origin(headers, peer, self.trust_proxy));
        let key = format!("rl:{}:{}", policy.scope, identity);

        let hit = match self.store.hit(&key, policy.window_secs).await {
            Ok(Some(hit)) => hit,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::warn!("Rate limiter degraded, allowing {}: {}", key, e);
                return Ok(());
            }
        };

        if hit.count <= policy.max_requests {
            return Ok(());
        }

        let retry_after = match self.store.remaining(&key).await {
            Ok(Some(secs)) if secs > 0 => secs,
            _ => policy.window_secs,
        };
        tracing::warn!(
            "Rate limit exceeded for {} ({} > {}), retry in {}s",
            key,
            hit.count,
            policy.max_requests,
            retry_after
        );
        Err(ApiError::rate_limited(
            "Too many requests, please try again later",
            retry_after.max(1),
        ))
    }
}

/// Caller's network origin: first forwarded hop behind a trusted proxy, else the socket peer
pub fn network_origin(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::store::tests::{settings, MemoryCounters};
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    fn limiter(store: FastStore) -> RateLimiter {
        RateLimiter::new(Arc::new(store), false)
    }

    #[tokio::test]
    async fn allows_max_then_limits() {
        let limiter = limiter(FastStore::with_backend(Arc::new(MemoryCounters::default()), settings(0)));
        let policy = RateLimitPolicy::new("contact", 900, 3);
        let headers = HeaderMap::new();

        for _ in 0..3 {
            limiter.check(&policy, &headers, peer()).await.unwrap();
        }
        let err = limiter.check(&policy, &headers, peer()).await.unwrap_err();
        assert_eq!(err, ApiError::rate_limited("Too many requests, please try again later", 900));
    }

    #[tokio::test]
    async fn absent_store_never_limits() {
        let limiter = limiter(FastStore::absent());
        let policy = RateLimitPolicy::new("contact", 900, 3);
        for _ in 0..4 {
            limiter.check(&policy, &HeaderMap::new(), peer()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn disconnected_store_never_limits() {
        let memory = Arc::new(MemoryCounters::failing(StoreError::Connection("reset by peer".into())));
        let store = Arc::new(FastStore::with_backend(memory.clone(), settings(2)));
        let limiter = RateLimiter::new(store.clone(), false);
        let policy = RateLimitPolicy::new("application", 3600, 1);

        for _ in 0..2 {
            limiter.check(&policy, &HeaderMap::new(), peer()).await.unwrap();
        }
        assert!(store.is_disabled());
        assert_eq!(memory.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn command_errors_are_swallowed() {
        let memory = Arc::new(MemoryCounters::failing(StoreError::Timeout("INCR")));
        let limiter = limiter(FastStore::with_backend(memory, settings(1)));
        let policy = RateLimitPolicy::new("contact", 60, 1);
        for _ in 0..3 {
            limiter.check(&policy, &HeaderMap::new(), peer()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn block_lifts_after_a_failed_first_expire() {
        let memory = Arc::new(MemoryCounters::default());
        memory.expire_failures.store(1, std::sync::atomic::Ordering::SeqCst);
        let limiter = limiter(FastStore::with_backend(memory.clone(), settings(0)));
        let policy = RateLimitPolicy::new("contact", 60, 2);
        let key = "rl:contact:10.0.0.7";

        for _ in 0..2 {
            limiter.check(&policy, &HeaderMap::new(), peer()).await.unwrap();
        }
        let err = limiter.check(&policy, &HeaderMap::new(), peer()).await.unwrap_err();
        assert_eq!(err.error_code(), "RATE_LIMITED");
        assert_eq!(memory.expiry_of(key), Some(60));

        memory.elapse(key);
        limiter.check(&policy, &HeaderMap::new(), peer()).await.unwrap();
    }

    #[tokio::test]
    async fn identities_are_counted_separately() {
        let limiter = limiter(FastStore::with_backend(Arc::new(MemoryCounters::default()), settings(0)));
        let policy = RateLimitPolicy::new("contact", 60, 1);

        limiter.check(&policy, &HeaderMap::new(), peer()).await.unwrap();
        limiter
            .check(&policy, &HeaderMap::new(), Some("10.0.0.8:1".parse().unwrap()))
            .await
            .unwrap();
        assert!(limiter.check(&policy, &HeaderMap::new(), peer()).await.is_err());
    }

    #[tokio::test]
    async fn custom_identity_takes_precedence() {
        fn by_client(headers: &HeaderMap) -> Option<String> {
            headers.get("x-client-id")?.to_str().ok().map(str::to_string)
        }

        let limiter = limiter(FastStore::with_backend(Arc::new(MemoryCounters::default()), settings(0)));
        let policy = RateLimitPolicy::new("contact", 60, 1).with_identity(by_client);

        let mut headers = HeaderMap::new();
        headers.insert("x-client-id", HeaderValue::from_static("kiosk-1"));
        limiter.check(&policy, &headers, peer()).await.unwrap();
        // Same client from another address is still the same identity
        assert!(limiter
            .check(&policy, &headers, Some("192.168.1.1:80".parse().unwrap()))
            .await
            .is_err());
    }

    #[test]
    fn forwarded_header_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));

        assert_eq!(network_origin(&headers, peer(), true), "203.0.113.9");
        assert_eq!(network_origin(&headers, peer(), false), "10.0.0.7");
        assert_eq!(network_origin(&HeaderMap::new(), None, true), "unknown");
    }
}

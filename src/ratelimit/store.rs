use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::redis_store::RedisCounterStore;
use crate::config::FastStoreConfig;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The store cannot be reached at all (refused, dropped, DNS, bad URL)
    #[error("fast store connection failed: {0}")]
    Connection(String),

    #[error("fast store {0} timed out")]
    Timeout(&'static str),

    #[error("fast store command failed: {0}")]
    Command(String),
}

impl StoreError {
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Minimal counter operations the limiter needs from a fast store
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(&self, key: &str) -> Result<u64, StoreError>;
    async fn expire(&self, key: &str, secs: u64) -> Result<(), StoreError>;
    /// Remaining time-to-live in seconds, `None` when the key has no expiry or is gone
    async fn ttl(&self, key: &str) -> Result<Option<u64>, StoreError>;
}

#[derive(Debug, Clone, Copy)]
pub struct StoreSettings {
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub command_retries: u32,
}

impl From<&FastStoreConfig> for StoreSettings {
    fn from(config: &FastStoreConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            command_retries: config.command_retries,
        }
    }
}

/// Result of counting one request into a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterHit {
    pub count: u64,
    pub first_in_window: bool,
}

/// Shared, lazily connected handle to the fast store.
///
/// The first caller connects (single flight); everyone else waits on that
/// attempt. A connection-class failure flips `disabled` for the rest of the
/// process lifetime, after which every call reports the store as absent.
pub struct FastStore {
    url: Option<String>,
    settings: StoreSettings,
    backend: OnceCell<Arc<dyn CounterStore>>,
    disabled: AtomicBool,
}

impl FastStore {
    pub fn from_config(config: &FastStoreConfig) -> Self {
        Self {
            url: config.url.clone(),
            settings: StoreSettings::from(config),
            backend: OnceCell::new(),
            disabled: AtomicBool::new(false),
        }
    }

    /// No store configured; rate limiting is off
    pub fn absent() -> Self {
        Self {
            url: None,
            settings: StoreSettings {
                connect_timeout: Duration::ZERO,
                command_timeout: Duration::ZERO,
                command_retries: 0,
            },
            backend: OnceCell::new(),
            disabled: AtomicBool::new(false),
        }
    }

    /// Use an already constructed backend (tests, alternative stores)
    pub fn with_backend(backend: Arc<dyn CounterStore>, settings: StoreSettings) -> Self {
        Self {
            url: None,
            settings,
            backend: OnceCell::new_with(Some(backend)),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.backend.initialized()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// "absent" / "disabled" / "connected" / "idle", for the health endpoint
    pub fn status(&self) -> &'static str {
        if !self.is_configured() {
            "absent"
        } else if self.is_disabled() {
            "disabled"
        } else if self.backend.initialized() {
            "connected"
        } else {
            "idle"
        }
    }

    fn disable(&self, err: &StoreError) {
        if !self.disabled.swap(true, Ordering::AcqRel) {
            tracing::warn!("Disabling fast store until restart: {}", err);
        }
    }

    async fn connection(&self) -> Option<Arc<dyn CounterStore>> {
        if self.is_disabled() {
            return None;
        }
        if let Some(backend) = self.backend.get() {
            return Some(backend.clone());
        }
        let url = self.url.as_deref()?;

        let result = self
            .backend
            .get_or_try_init(|| async {
                // A waiter may arrive after a failed attempt already disabled the store
                if self.is_disabled() {
                    return Err(StoreError::Connection("disabled".to_string()));
                }
                let store = RedisCounterStore::connect(url, self.settings.connect_timeout).await?;
                tracing::info!("Connected to fast store");
                Ok::<Arc<dyn CounterStore>, StoreError>(Arc::new(store))
            })
            .await;

        match result {
            Ok(backend) => Some(backend.clone()),
            Err(e) => {
                self.disable(&e);
                None
            }
        }
    }

    /// Run one command under the per-command timeout, retrying non-connection
    /// failures up to the configured budget.
    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.settings.command_timeout, command()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(op)),
            };

            match result {
                Err(e) if e.is_connection() => {
                    self.disable(&e);
                    return Err(e);
                }
                Err(e) if attempt < self.settings.command_retries => {
                    attempt += 1;
                    tracing::debug!("Retrying fast store {} (attempt {}): {}", op, attempt, e);
                }
                other => return other,
            }
        }
    }

    /// Count one request against `key`, starting a `window_secs` expiry on the
    /// first hit. `Ok(None)` means the store is absent or disabled.
    ///
    /// INCR and EXPIRE are separate commands, so a later hit that finds the
    /// counter without an expiry arms it again. A counter never outlives its
    /// window by more than one failed EXPIRE.
    pub async fn hit(&self, key: &str, window_secs: u64) -> Result<Option<CounterHit>, StoreError> {
        let Some(backend) = self.connection().await else {
            return Ok(None);
        };
        let store: &dyn CounterStore = backend.as_ref();

        let count = self.run("INCR", move || store.incr(key)).await?;
        let first_in_window = count == 1;
        if first_in_window {
            self.run("EXPIRE", move || store.expire(key, window_secs)).await?;
        } else if self.run("TTL", move || store.ttl(key)).await?.is_none() {
            tracing::warn!("Counter {} had no expiry, restarting its window", key);
            self.run("EXPIRE", move || store.expire(key, window_secs)).await?;
        }

        Ok(Some(CounterHit { count, first_in_window }))
    }

    /// Seconds until `key` expires, if the store can tell us
    pub async fn remaining(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let Some(backend) = self.connection().await else {
            return Ok(None);
        };
        let store: &dyn CounterStore = backend.as_ref();
        self.run("TTL", move || store.ttl(key)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    /// In-process counter store with scripted failures
    #[derive(Default)]
    pub struct MemoryCounters {
        counts: Mutex<HashMap<String, u64>>,
        expiries: Mutex<HashMap<String, u64>>,
        pub fail_with: Mutex<Option<StoreError>>,
        pub transient_failures: AtomicU32,
        /// EXPIRE calls that fail before one succeeds
        pub expire_failures: AtomicU32,
        pub calls: AtomicU32,
    }

    impl MemoryCounters {
        pub fn failing(err: StoreError) -> Self {
            let store = Self::default();
            *store.fail_with.lock().unwrap() = Some(err);
            store
        }

        fn check(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
                return Err(err);
            }
            let pending = self.transient_failures.load(Ordering::SeqCst);
            if pending > 0 {
                self.transient_failures.store(pending - 1, Ordering::SeqCst);
                return Err(StoreError::Command("LOADING".to_string()));
            }
            Ok(())
        }

        pub fn expiry_of(&self, key: &str) -> Option<u64> {
            self.expiries.lock().unwrap().get(key).copied()
        }

        /// Let the window of `key` run out: keys with an expiry vanish, keys without one stay
        pub fn elapse(&self, key: &str) {
            if self.expiries.lock().unwrap().remove(key).is_some() {
                self.counts.lock().unwrap().remove(key);
            }
        }
    }

    #[async_trait]
    impl CounterStore for MemoryCounters {
        async fn incr(&self, key: &str) -> Result<u64, StoreError> {
            self.check()?;
            let mut counts = self.counts.lock().unwrap();
            let count = counts.entry(key.to_string()).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn expire(&self, key: &str, secs: u64) -> Result<(), StoreError> {
            self.check()?;
            let pending = self.expire_failures.load(Ordering::SeqCst);
            if pending > 0 {
                self.expire_failures.store(pending - 1, Ordering::SeqCst);
                return Err(StoreError::Command("LOADING".to_string()));
            }
            self.expiries.lock().unwrap().insert(key.to_string(), secs);
            Ok(())
        }

        async fn ttl(&self, key: &str) -> Result<Option<u64>, StoreError> {
            self.check()?;
            Ok(self.expiry_of(key))
        }
    }

    pub fn settings(retries: u32) -> StoreSettings {
        StoreSettings {
            connect_timeout: Duration::from_millis(50),
            command_timeout: Duration::from_millis(50),
            command_retries: retries,
        }
    }

    #[tokio::test]
    async fn first_hit_starts_the_window() {
        let memory = Arc::new(MemoryCounters::default());
        let store = FastStore::with_backend(memory.clone(), settings(0));

        let first = store.hit("rl:contact:1.2.3.4", 900).await.unwrap().unwrap();
        assert_eq!(first, CounterHit { count: 1, first_in_window: true });
        assert_eq!(memory.expiry_of("rl:contact:1.2.3.4"), Some(900));

        let second = store.hit("rl:contact:1.2.3.4", 900).await.unwrap().unwrap();
        assert_eq!(second.count, 2);
        assert!(!second.first_in_window);
        assert_eq!(store.status(), "connected");
    }

    #[tokio::test]
    async fn failed_first_expire_is_rearmed_on_next_hit() {
        let memory = Arc::new(MemoryCounters::default());
        memory.expire_failures.store(1, Ordering::SeqCst);
        let store = FastStore::with_backend(memory.clone(), settings(0));

        assert!(matches!(store.hit("k", 60).await, Err(StoreError::Command(_))));
        assert_eq!(memory.expiry_of("k"), None);
        assert!(!store.is_disabled());

        let second = store.hit("k", 60).await.unwrap().unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(memory.expiry_of("k"), Some(60));

        memory.elapse("k");
        let fresh = store.hit("k", 60).await.unwrap().unwrap();
        assert_eq!(fresh, CounterHit { count: 1, first_in_window: true });
    }

    #[tokio::test]
    async fn absent_store_reports_none() {
        let store = FastStore::absent();
        assert_eq!(store.hit("k", 60).await.unwrap(), None);
        assert_eq!(store.status(), "absent");
    }

    #[tokio::test]
    async fn transient_errors_are_retried_within_budget() {
        let memory = Arc::new(MemoryCounters::default());
        memory.transient_failures.store(1, Ordering::SeqCst);
        let store = FastStore::with_backend(memory.clone(), settings(1));

        let hit = store.hit("k", 60).await.unwrap().unwrap();
        assert_eq!(hit.count, 1);
        assert!(!store.is_disabled());
    }

    #[tokio::test]
    async fn exhausted_retries_surface_without_disabling() {
        let memory = Arc::new(MemoryCounters::default());
        memory.transient_failures.store(5, Ordering::SeqCst);
        let store = FastStore::with_backend(memory.clone(), settings(1));

        assert!(matches!(store.hit("k", 60).await, Err(StoreError::Command(_))));
        assert_eq!(memory.calls.load(Ordering::SeqCst), 2);
        assert!(!store.is_disabled());
    }

    #[tokio::test]
    async fn connection_failure_disables_durably() {
        let memory = Arc::new(MemoryCounters::failing(StoreError::Connection("refused".into())));
        let store = FastStore::with_backend(memory.clone(), settings(3));

        assert!(store.hit("k", 60).await.is_err());
        assert!(store.is_disabled());
        assert_eq!(memory.calls.load(Ordering::SeqCst), 1);

        // Later calls short-circuit without touching the backend
        *memory.fail_with.lock().unwrap() = None;
        assert_eq!(store.hit("k", 60).await.unwrap(), None);
        assert_eq!(memory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.status(), "disabled");
    }

    #[tokio::test]
    async fn unreachable_url_disables_after_one_attempt() {
        let config = FastStoreConfig {
            // Port 1 on loopback is never a Redis server
            url: Some("redis://127.0.0.1:1/".to_string()),
            connect_timeout_ms: 200,
            command_timeout_ms: 200,
            command_retries: 0,
        };
        let store = FastStore::from_config(&config);
        assert_eq!(store.status(), "idle");

        assert_eq!(store.hit("k", 60).await.unwrap(), None);
        assert!(store.is_disabled());
        assert_eq!(store.hit("k", 60).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_url_disables() {
        let config = FastStoreConfig {
            url: Some("not a url".to_string()),
            connect_timeout_ms: 200,
            command_timeout_ms: 200,
            command_retries: 0,
        };
        let store = FastStore::from_config(&config);
        assert_eq!(store.hit("k", 60).await.unwrap(), None);
        assert!(store.is_disabled());
    }
}

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub fast_store: FastStoreConfig,
    pub rate_limit: RateLimitConfig,
    pub list: ListConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Trust the first X-Forwarded-For hop as the caller's network origin
    pub trust_proxy: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HS256 signing secret. Absence is surfaced per request as an internal error.
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastStoreConfig {
    /// Redis URL. Absence disables rate limiting.
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub command_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub contact_window_secs: u64,
    pub contact_max_requests: u64,
    pub application_window_secs: u64,
    pub application_max_requests: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("BACKOFFICE_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("TRUST_PROXY") {
            self.server.trust_proxy = v.parse().unwrap_or(self.server.trust_proxy);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Database overrides
        self.database.url = non_empty_var("DATABASE_URL");
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        self.security.jwt_secret = non_empty_var("JWT_SECRET");
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Fast store overrides
        self.fast_store.url = non_empty_var("REDIS_URL");
        if let Ok(v) = env::var("REDIS_CONNECT_TIMEOUT_MS") {
            self.fast_store.connect_timeout_ms = v.parse().unwrap_or(self.fast_store.connect_timeout_ms);
        }
        if let Ok(v) = env::var("REDIS_COMMAND_TIMEOUT_MS") {
            self.fast_store.command_timeout_ms = v.parse().unwrap_or(self.fast_store.command_timeout_ms);
        }
        if let Ok(v) = env::var("REDIS_COMMAND_RETRIES") {
            self.fast_store.command_retries = v.parse().unwrap_or(self.fast_store.command_retries);
        }

        // Rate limit overrides
        if let Ok(v) = env::var("RATE_LIMIT_CONTACT_WINDOW_SECS") {
            self.rate_limit.contact_window_secs = v.parse().unwrap_or(self.rate_limit.contact_window_secs);
        }
        if let Ok(v) = env::var("RATE_LIMIT_CONTACT_MAX") {
            self.rate_limit.contact_max_requests = v.parse().unwrap_or(self.rate_limit.contact_max_requests);
        }
        if let Ok(v) = env::var("RATE_LIMIT_APPLICATION_WINDOW_SECS") {
            self.rate_limit.application_window_secs =
                v.parse().unwrap_or(self.rate_limit.application_window_secs);
        }
        if let Ok(v) = env::var("RATE_LIMIT_APPLICATION_MAX") {
            self.rate_limit.application_max_requests =
                v.parse().unwrap_or(self.rate_limit.application_max_requests);
        }

        // List overrides
        if let Ok(v) = env::var("LIST_DEFAULT_LIMIT") {
            self.list.default_limit = v.parse().unwrap_or(self.list.default_limit);
        }
        if let Ok(v) = env::var("LIST_MAX_LIMIT") {
            self.list.max_limit = v.parse().unwrap_or(self.list.max_limit);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4000,
                trust_proxy: false,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                acquire_timeout_secs: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: None,
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            fast_store: FastStoreConfig {
                url: None,
                connect_timeout_ms: 2000,
                command_timeout_ms: 500,
                command_retries: 1,
            },
            rate_limit: RateLimitConfig {
                contact_window_secs: 15 * 60,
                contact_max_requests: 50,
                application_window_secs: 60 * 60,
                application_max_requests: 20,
            },
            list: ListConfig {
                default_limit: 20,
                max_limit: 100,
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.trust_proxy = true;
        config.server.cors_origins = vec!["https://staging.example.com".to_string()];
        config.database.max_connections = 20;
        config.database.acquire_timeout_secs = 10;
        config.security.jwt_expiry_hours = 24;
        config.fast_store.connect_timeout_ms = 1000;
        config.fast_store.command_timeout_ms = 250;
        config.rate_limit.contact_max_requests = 10;
        config.rate_limit.application_max_requests = 5;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.server.cors_origins = vec!["https://www.example.com".to_string()];
        config.database.max_connections = 50;
        config.database.acquire_timeout_secs = 5;
        config.database.run_migrations = false;
        config.security.jwt_expiry_hours = 8;
        config.rate_limit.contact_max_requests = 5;
        config.rate_limit.application_max_requests = 3;
        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

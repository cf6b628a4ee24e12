//! Configuration loading and management
//!
//! Configuration comes from an optional YAML file named by `WORKSHOP_CONFIG`,
//! with every section defaulted, and a few environment overrides:
//!
//! - `SECRET_KEY`: token signing secret
//! - `WORKSHOP_BIND`: listen address
//! - `DATABASE_URL`: SQLite connection string (in-memory tables when unset)
//!
//! ```yaml
//! server:
//!   bind: "0.0.0.0:5000"
//! database:
//!   url: "sqlite://workshop.db"
//! auth:
//!   secret_key: "change-me"
//! cache:
//!   ttl_secs: 30
//! rate_limit:
//!   requests_per_window: 100
//!   window_secs: 3600
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

/// Environment variable naming the YAML config file
pub const CONFIG_PATH_ENV: &str = "WORKSHOP_CONFIG";
/// Environment variable overriding the signing secret
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";
/// Environment variable overriding the bind address
pub const BIND_ENV: &str = "WORKSHOP_BIND";
/// Environment variable overriding the database connection string
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub password: PasswordConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub pagination: PaginationConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Persistent storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string such as `sqlite://workshop.db`; `None` keeps every
    /// table in process memory
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// Token signing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret_key: Option<String>,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    /// Minimum legal cost, for tests only
    pub fn cheap() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a cached GET response stays fresh (0 disables the cache)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 }
    }
}

/// Fixed-window rate limits (0 requests disables a limiter)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_secs: u64,
    pub login_requests_per_window: u32,
    pub login_window_secs: u64,
    /// Budget for `POST` on a collection (account, ticket and part creation)
    pub create_requests_per_window: u32,
    pub create_window_secs: u64,
    /// Key clients by the first `X-Forwarded-For` hop instead of the peer
    /// address; only safe behind a proxy that overwrites the header
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_secs: 3600,
            login_requests_per_window: 10,
            login_window_secs: 60,
            create_requests_per_window: 10,
            create_window_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// List paging limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Larger `per_page` values are clamped to this
    pub max_per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_per_page: 100 }
    }
}

impl WorkshopConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("invalid configuration")?;
        Ok(config)
    }

    /// Load from the file named by `WORKSHOP_CONFIG` (if any) plus env overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment-style overrides from a lookup function
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SECRET_KEY_ENV).filter(|s| !s.is_empty()) {
            self.auth.secret_key = Some(secret);
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|s| !s.trim().is_empty()) {
            self.server.bind = bind.trim().to_string();
        }
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|s| !s.trim().is_empty()) {
            self.database.url = Some(url.trim().to_string());
        }
    }

    /// Configuration for isolated test instances
    ///
    /// In-memory tables, cache and rate limiting off, a fixed secret and
    /// cheap hashing.
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig {
                secret_key: Some("workshop-test-secret".to_string()),
            },
            password: PasswordConfig::cheap(),
            cache: CacheConfig { ttl_secs: 0 },
            rate_limit: RateLimitConfig {
                requests_per_window: 0,
                login_requests_per_window: 0,
                create_requests_per_window: 0,
                ..RateLimitConfig::default()
            },
            pagination: PaginationConfig::default(),
        }
    }

    /// Parse the bind address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("invalid bind address {}", self.server.bind))
    }

    /// The token signing secret
    ///
    /// Without a configured secret a random one is generated; tokens then do
    /// not survive a restart.
    pub fn signing_secret(&self) -> String {
        match self.auth.secret_key.as_deref() {
            Some(secret) if !secret.is_empty() => secret.to_string(),
            _ => {
                tracing::warn!(
                    "no {} configured, using a random per-process secret",
                    SECRET_KEY_ENV
                );
                format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkshopConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(config.auth.secret_key.is_none());
        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.rate_limit.requests_per_window, 100);
        assert_eq!(config.rate_limit.login_requests_per_window, 10);
        assert_eq!(config.rate_limit.create_requests_per_window, 10);
        assert!(!config.rate_limit.trust_forwarded_for);
        assert_eq!(config.pagination.max_per_page, 100);
        assert!(config.database.url.is_none());
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let config = WorkshopConfig::from_yaml_str(
            "server:\n  bind: \"0.0.0.0:8080\"\ncache:\n  ttl_secs: 5\n",
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.cache.ttl_secs, 5);
        assert_eq!(config.password.memory_kib, 19456);
        assert_eq!(config.rate_limit.window_secs, 3600);
    }

    #[test]
    fn test_yaml_serialization() {
        let config = WorkshopConfig::for_tests();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = WorkshopConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.auth.secret_key, config.auth.secret_key);
        assert_eq!(parsed.cache.ttl_secs, 0);
    }

    #[test]
    fn test_overrides() {
        let mut config = WorkshopConfig::default();
        config.apply_overrides(|key| match key {
            SECRET_KEY_ENV => Some("s3cret".to_string()),
            BIND_ENV => Some(" 0.0.0.0:9000 ".to_string()),
            DATABASE_URL_ENV => Some("sqlite://workshop.db".to_string()),
            _ => None,
        });
        assert_eq!(config.signing_secret(), "s3cret");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.database.url.as_deref(), Some("sqlite://workshop.db"));
    }

    #[test]
    fn test_random_secret_when_missing() {
        let config = WorkshopConfig::default();
        let a = config.signing_secret();
        let b = config.signing_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(WorkshopConfig::from_yaml_str("server: [").is_err());
    }
}

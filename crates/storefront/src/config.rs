//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Storage
//! - `BRAMBLE_STORAGE` - `memory` or `postgres` (default: `postgres` when a
//!   database URL is set, otherwise `memory`)
//! - `BRAMBLE_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL`. Required for the `postgres` backend.
//!
//! ## Optional
//! - `BRAMBLE_HOST` - Bind address (default: 127.0.0.1)
//! - `BRAMBLE_PORT` - Listen port (default: 3000)
//! - `BRAMBLE_BASE_URL` - Public URL (default: `http://localhost:3000`).
//!   Session cookies are marked `Secure` when this is `https`.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which storage adapter serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl StorageBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("expected 'memory' or 'postgres', got '{other}'")),
        }
    }
}

/// Storage selection plus whatever the chosen backend needs.
#[derive(Clone)]
pub enum StorageConfig {
    Memory,
    Postgres { database_url: SecretString },
}

impl StorageConfig {
    #[must_use]
    pub const fn backend(&self) -> StorageBackend {
        match self {
            Self::Memory => StorageBackend::Memory,
            Self::Postgres { .. } => StorageBackend::Postgres,
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Sentry error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Storage backend and its connection settings
    pub storage: StorageConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    pub sentry: SentryConfig,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, or if the `postgres`
    /// backend is selected without a database URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let storage = storage_config(&env)?;
        let host = env.parse_or_default::<IpAddr>("BRAMBLE_HOST", "127.0.0.1")?;
        let port = env.parse_or_default::<u16>("BRAMBLE_PORT", "3000")?;
        let base_url = env.get_or_default("BRAMBLE_BASE_URL", "http://localhost:3000");

        let sentry = SentryConfig {
            dsn: env.get_optional("SENTRY_DSN"),
            environment: env.get_optional("SENTRY_ENVIRONMENT"),
            sample_rate: env.parse_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: env.parse_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            storage,
            host,
            port,
            base_url,
            sentry,
        })
    }

    /// Configuration for tests and local runs: memory storage on localhost.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            storage: StorageConfig::Memory,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            sentry: SentryConfig::default(),
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

fn storage_config<F>(env: &Env<F>) -> Result<StorageConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = env.database_url("BRAMBLE_DATABASE_URL");

    let backend = match env.get_optional("BRAMBLE_STORAGE") {
        Some(raw) => raw
            .parse::<StorageBackend>()
            .map_err(|e| ConfigError::InvalidEnvVar("BRAMBLE_STORAGE".to_string(), e))?,
        None if database_url.is_some() => StorageBackend::Postgres,
        None => StorageBackend::Memory,
    };

    match backend {
        StorageBackend::Memory => Ok(StorageConfig::Memory),
        StorageBackend::Postgres => database_url
            .map(|database_url| StorageConfig::Postgres { database_url })
            .ok_or_else(|| ConfigError::MissingEnvVar("BRAMBLE_DATABASE_URL".to_string())),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable. Empty values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }

    fn parse_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get_or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.get_optional(primary_key)
            .or_else(|| self.get_optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_memory_without_database_url() {
        let config = load(&[]).unwrap();
        assert_eq!(config.storage.backend(), StorageBackend::Memory);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(!config.is_https());
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/bramble")]).unwrap();
        let StorageConfig::Postgres { database_url } = config.storage else {
            panic!("expected postgres storage");
        };
        assert_eq!(database_url.expose_secret(), "postgres://localhost/bramble");
    }

    #[test]
    fn test_primary_database_url_wins() {
        let config = load(&[
            ("BRAMBLE_DATABASE_URL", "postgres://primary/db"),
            ("DATABASE_URL", "postgres://fallback/db"),
        ])
        .unwrap();
        let StorageConfig::Postgres { database_url } = config.storage else {
            panic!("expected postgres storage");
        };
        assert_eq!(database_url.expose_secret(), "postgres://primary/db");
    }

    #[test]
    fn test_explicit_memory_overrides_database_url() {
        let config = load(&[
            ("BRAMBLE_STORAGE", "memory"),
            ("DATABASE_URL", "postgres://localhost/bramble"),
        ])
        .unwrap();
        assert_eq!(config.storage.backend(), StorageBackend::Memory);
    }

    #[test]
    fn test_postgres_requires_url() {
        let err = load(&[("BRAMBLE_STORAGE", "postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "BRAMBLE_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("BRAMBLE_STORAGE", "sqlite")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("BRAMBLE_PORT", "not-a-port")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("SENTRY_SAMPLE_RATE", "often")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_https_base_url() {
        let config = load(&[("BRAMBLE_BASE_URL", "https://shop.example.com")]).unwrap();
        assert!(config.is_https());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("DATABASE_URL", "postgres://user:hunter2@db/bramble")]).unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }
}

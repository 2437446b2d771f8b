// Runtime configuration loaded from the environment (and an optional .env file)

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::providers::RetryPolicy;

/// Errors raised while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Where canonical reservations, inventory and promo codes are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Credentials and defaults for the legacy XML provider
#[derive(Debug, Clone, Default)]
pub struct LegacyXmlSettings {
    /// Endpoint used for properties that predate multi-provider support
    pub default_endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// JSON file with properties, inventory and promo codes for the memory backend
    pub memory_seed_path: Option<String>,
    pub modern_rest_partner_token: Option<String>,
    pub legacy_xml: LegacyXmlSettings,
    pub provider_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            storage: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 5,
            memory_seed_path: None,
            modern_rest_partner_token: None,
            legacy_xml: LegacyXmlSettings::default(),
            provider_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let defaults_retry = RetryPolicy::default();

        let storage = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                value,
            })?,
            None => StorageBackend::Postgres,
        };

        let database_url = non_empty(lookup("DATABASE_URL"));
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let timeout_secs: u64 = parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", 30)?;
        let max_attempts: u32 = parse_or(&lookup, "PROVIDER_MAX_ATTEMPTS", defaults_retry.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "PROVIDER_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let initial_backoff_ms: u64 = parse_or(
            &lookup,
            "PROVIDER_INITIAL_BACKOFF_MS",
            defaults_retry.initial_backoff.as_millis() as u64,
        )?;
        let max_backoff_ms: u64 = parse_or(
            &lookup,
            "PROVIDER_MAX_BACKOFF_MS",
            defaults_retry.max_backoff.as_millis() as u64,
        )?;

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            storage,
            database_url,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            memory_seed_path: non_empty(lookup("MEMORY_SEED_PATH")),
            modern_rest_partner_token: non_empty(lookup("MODERN_REST_PARTNER_TOKEN")),
            legacy_xml: LegacyXmlSettings {
                default_endpoint: non_empty(lookup("LEGACY_XML_DEFAULT_ENDPOINT")),
                username: non_empty(lookup("LEGACY_XML_USERNAME")),
                password: non_empty(lookup("LEGACY_XML_PASSWORD")),
            },
            provider_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                max_attempts,
                initial_backoff: Duration::from_millis(initial_backoff_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
                ..defaults_retry
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_memory_backend_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("STORAGE_BACKEND", "memory")]))
            .expect("memory config should load");

        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.port, 8080);
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.modern_rest_partner_token.is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgresql://localhost/pms"),
            ("PORT", "9090"),
            ("PROVIDER_MAX_ATTEMPTS", "5"),
            ("PROVIDER_INITIAL_BACKOFF_MS", "50"),
            ("MODERN_REST_PARTNER_TOKEN", "secret"),
            ("LEGACY_XML_USERNAME", "   "),
        ]))
        .expect("config should load");

        assert_eq!(config.port, 9090);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(50));
        assert_eq!(config.modern_rest_partner_token.as_deref(), Some("secret"));
        assert!(config.legacy_xml.username.is_none());
        assert_eq!(config.bind_address(), "0.0.0.0:9090");
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("PORT", "not-a-port"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { name: "PORT", .. })));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("PROVIDER_MAX_ATTEMPTS", "0"),
        ]));
        assert!(result.is_err());
    }
}

//! Environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration errors raised at start-up
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres settings store; in-memory defaults when absent
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub settings_cache_ttl: Duration,
    pub distance_cache_ttl: Duration,
    pub distance_timeout: Duration,
    pub settings_warm_interval: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = match lookup("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                expected: "a socket address",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    expected: "'pretty' or 'json'",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            bind_addr,
            settings_cache_ttl: Duration::from_secs(positive_u64(&lookup, "SETTINGS_CACHE_TTL_SECS", 60 * 60)?),
            distance_cache_ttl: Duration::from_secs(positive_u64(&lookup, "DISTANCE_CACHE_TTL_SECS", 24 * 60 * 60)?),
            distance_timeout: Duration::from_millis(positive_u64(&lookup, "DISTANCE_TIMEOUT_MS", 3_000)?),
            settings_warm_interval: Duration::from_secs(positive_u64(&lookup, "SETTINGS_WARM_INTERVAL_SECS", 10 * 60)?),
            log_format,
        })
    }
}

/// Positive integer variable, or `default` when unset
fn positive_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid {
                name,
                expected: "a positive integer",
                value,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.settings_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.distance_timeout, Duration::from_millis(3000));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/quotes"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DISTANCE_TIMEOUT_MS", "500"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/quotes"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.distance_timeout, Duration::from_millis(500));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config(&[("SETTINGS_CACHE_TTL_SECS", "soon")]).is_err());
        assert!(config(&[("DISTANCE_TIMEOUT_MS", "0")]).is_err());
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(config(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        assert!(config(&[("DATABASE_URL", "  ")]).unwrap().database_url.is_none());
    }
}

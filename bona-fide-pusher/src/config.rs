//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup. Missing required settings are fatal.

use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default downstream request timeout in milliseconds.
pub const DEFAULT_ELIXIR_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration key {key}")]
    Missing { key: &'static str },

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host the listener binds to
    pub url: String,

    /// Port the listener binds to
    pub port: u16,

    /// Elixir bona fide registration endpoint
    pub elixir_url: Url,

    /// Basic auth username for Elixir
    pub elixir_userid: String,

    /// Basic auth password for Elixir
    pub elixir_password: String,

    /// Timeout for the Elixir call in milliseconds, 0 disables it
    pub elixir_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing { key })
        };

        let port_raw = required("PORT")?;
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid {
                key: "PORT",
                value: port_raw.clone(),
                reason: e.to_string(),
            })?;

        let elixir_raw = required("ELIXIR_URL")?;
        let elixir_url = parse_http_url("ELIXIR_URL", &elixir_raw)?;

        let elixir_timeout_ms = match lookup("ELIXIR_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "ELIXIR_TIMEOUT_MS",
                value: raw.clone(),
                reason: "expected milliseconds as an unsigned integer".to_string(),
            })?,
            None => DEFAULT_ELIXIR_TIMEOUT_MS,
        };

        Ok(Config {
            url: required("URL")?,
            port,
            elixir_url,
            elixir_userid: required("ELIXIR_USERID")?,
            elixir_password: required("ELIXIR_PASSWORD")?,
            elixir_timeout_ms,
        })
    }

    /// Downstream timeout, `None` when disabled.
    pub fn elixir_timeout(&self) -> Option<Duration> {
        match self.elixir_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

fn parse_http_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: format!("unsupported scheme {}", other),
        }),
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

    fn full() -> Vec<(&'static str, &'static str)> {
        vec![
            ("URL", "127.0.0.1"),
            ("PORT", "8080"),
            ("ELIXIR_URL", "https://elixir.example.org/bonafide"),
            ("ELIXIR_USERID", "rems"),
            ("ELIXIR_PASSWORD", "secret"),
        ]
    }

    #[test]
    fn test_load_complete_config() {
        let config = Config::from_lookup(lookup_from(&full())).unwrap();
        assert_eq!(config.url, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.elixir_url.as_str(), "https://elixir.example.org/bonafide");
        assert_eq!(config.elixir_userid, "rems");
        assert_eq!(config.elixir_password, "secret");
        assert_eq!(config.elixir_timeout_ms, DEFAULT_ELIXIR_TIMEOUT_MS);
        assert_eq!(
            config.elixir_timeout(),
            Some(Duration::from_millis(DEFAULT_ELIXIR_TIMEOUT_MS))
        );
    }

    #[test]
    fn test_each_required_key_is_enforced() {
        for missing in ["URL", "PORT", "ELIXIR_URL", "ELIXIR_USERID", "ELIXIR_PASSWORD"] {
            let pairs: Vec<_> = full().into_iter().filter(|(k, _)| *k != missing).collect();
            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert_eq!(err, ConfigError::Missing { key: missing });
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = full();
        pairs.retain(|(k, _)| *k != "ELIXIR_PASSWORD");
        pairs.push(("ELIXIR_PASSWORD", "   "));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing { key: "ELIXIR_PASSWORD" });
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = full();
        pairs.retain(|(k, _)| *k != "PORT");
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_invalid_elixir_url() {
        let mut pairs = full();
        pairs.retain(|(k, _)| *k != "ELIXIR_URL");
        pairs.push(("ELIXIR_URL", "ftp://elixir.example.org"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ELIXIR_URL", .. }));
    }

    #[test]
    fn test_timeout_zero_disables() {
        let mut pairs = full();
        pairs.push(("ELIXIR_TIMEOUT_MS", "0"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.elixir_timeout(), None);
    }

    #[test]
    fn test_timeout_must_be_numeric() {
        let mut pairs = full();
        pairs.push(("ELIXIR_TIMEOUT_MS", "soon"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ELIXIR_TIMEOUT_MS", .. }));
    }
}

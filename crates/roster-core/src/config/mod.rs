//! Client configuration for the profile endpoint.
//!
//! Defaults target the public generator service. Hosts may override them from
//! the environment or from a JSON document shipped with the app.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "https://randomuser.me";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
/// The endpoint refuses batches larger than this.
pub const MAX_BATCH_SIZE: usize = 5000;

const ENV_API_BASE_URL: &str = "ROSTER_API_BASE_URL";
const ENV_BATCH_SIZE: &str = "ROSTER_BATCH_SIZE";
const ENV_HTTP_TIMEOUT_SECS: &str = "ROSTER_HTTP_TIMEOUT_SECS";

/// Runtime settings for the remote source and sync coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash, e.g. `https://randomuser.me`
    pub api_base_url: String,
    /// Batch size used by `ensure_populated`
    pub default_batch_size: usize,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            default_batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read overrides from `ROSTER_*` environment variables.
    ///
    /// Unset or blank variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = normalize_text_option(lookup(ENV_API_BASE_URL)) {
            config.api_base_url = normalize_base_url(&url)?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_BATCH_SIZE)) {
            let size = raw.parse::<usize>().map_err(|_| {
                Error::InvalidInput(format!(
                    "{ENV_BATCH_SIZE} must be a positive integer, got '{}'",
                    compact_text(&raw)
                ))
            })?;
            config.default_batch_size = validate_batch_size(size)?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_HTTP_TIMEOUT_SECS)) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "{ENV_HTTP_TIMEOUT_SECS} must be a positive integer, got '{}'",
                        compact_text(&raw)
                    ))
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Parse a client configuration document.
///
/// Every field is optional; unknown fields are rejected.
pub fn parse_client_config(payload: &str) -> Result<ClientConfig> {
    let document: ClientConfigDocument = serde_json::from_str(payload)?;
    document.try_into()
}

// ---------------------------------------------------------------------------
// Private
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ClientConfigDocument {
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    default_batch_size: Option<usize>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
}

impl TryFrom<ClientConfigDocument> for ClientConfig {
    type Error = Error;

    fn try_from(document: ClientConfigDocument) -> Result<Self> {
        let defaults = Self::default();

        let api_base_url = match normalize_text_option(document.api_base_url) {
            Some(url) => normalize_base_url(&url)?,
            None => defaults.api_base_url,
        };
        let default_batch_size = document
            .default_batch_size
            .map_or(Ok(defaults.default_batch_size), validate_batch_size)?;
        let request_timeout = match document.request_timeout_secs {
            Some(0) => {
                return Err(Error::InvalidInput(
                    "request_timeout_secs must be greater than zero".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_base_url,
            default_batch_size,
            request_timeout,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = raw.trim();
    if !is_http_url(url) {
        return Err(Error::InvalidInput(format!(
            "api_base_url must include http:// or https://, got '{}'",
            compact_text(url)
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn validate_batch_size(size: usize) -> Result<usize> {
    if (1..=MAX_BATCH_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(Error::InvalidInput(format!(
            "batch size must be between 1 and {MAX_BATCH_SIZE}, got {size}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_target_public_endpoint() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "https://randomuser.me");
        assert_eq!(config.default_batch_size, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_API_BASE_URL, " http://localhost:8080/ "),
            (ENV_BATCH_SIZE, "25"),
            (ENV_HTTP_TIMEOUT_SECS, "3"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.default_batch_size, 25);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn blank_env_values_keep_defaults() {
        let lookup = lookup_from(&[(ENV_API_BASE_URL, "  "), (ENV_BATCH_SIZE, "")]);
        let config = ClientConfig::from_lookup(lookup).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_BATCH_SIZE, "ten")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_BATCH_SIZE, "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_HTTP_TIMEOUT_SECS, "0")])).is_err());
        assert!(
            ClientConfig::from_lookup(lookup_from(&[(ENV_API_BASE_URL, "randomuser.me")])).is_err()
        );
    }

    #[test]
    fn parse_client_config_accepts_partial_document() {
        let config = parse_client_config(r#"{"default_batch_size": 30}"#).unwrap();
        assert_eq!(config.default_batch_size, 30);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn parse_client_config_rejects_unknown_fields() {
        let result = parse_client_config(r#"{"api_base_url": "https://x.test", "extra": true}"#);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn parse_client_config_validates_values() {
        assert!(parse_client_config(r#"{"default_batch_size": 5001}"#).is_err());
        assert!(parse_client_config(r#"{"api_base_url": "ftp://x.test"}"#).is_err());
        assert!(parse_client_config(r#"{"request_timeout_secs": 0}"#).is_err());
    }
}

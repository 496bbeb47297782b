//! Token exchange configuration.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Production token endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://auth.zentinelproxy.io/oauth2/token";

/// Token exchange grant type (RFC 8693).
pub const GRANT_TYPE_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";

/// Subject token type of the signed assertion (RFC 8693 section 3).
pub const TOKEN_TYPE_JWT: &str = "urn:ietf:params:oauth:token-type:jwt";

/// Token exchange client configuration.
///
/// Resolved once at startup and handed to
/// [`TokenExchanger`](super::TokenExchanger); never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeConfig {
    /// Token endpoint URL.
    #[serde(default = "default_endpoint")]
    pub token_endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with the exchange request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            token_endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ExchangeConfig {
    /// Configuration targeting a specific endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            token_endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Apply an externally supplied endpoint override.
    ///
    /// `None` and blank values keep the current endpoint, so an unset
    /// environment variable falls through to the default.
    pub fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                self.token_endpoint = endpoint.to_string();
            }
        }
        self
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration and return the parsed endpoint.
    pub fn validate(&self) -> Result<Url, String> {
        let url = Url::parse(&self.token_endpoint)
            .map_err(|e| format!("Invalid token endpoint '{}': {}", self.token_endpoint, e))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(format!(
                "Token endpoint must use http or https, got '{}'",
                url.scheme()
            ));
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".to_string());
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExchangeConfig::default();
        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("zentinel-token-client/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_override() {
        let config = ExchangeConfig::default()
            .with_endpoint_override(Some("https://staging.example.com/token".to_string()));
        assert_eq!(config.token_endpoint, "https://staging.example.com/token");

        let config = ExchangeConfig::default().with_endpoint_override(Some("  ".to_string()));
        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);

        let config = ExchangeConfig::default().with_endpoint_override(None);
        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
    }

    #[test]
    fn test_validate_rejects_bad_endpoints() {
        assert!(ExchangeConfig::with_endpoint("not a url").validate().is_err());
        assert!(ExchangeConfig::with_endpoint("ftp://auth.example.com/token")
            .validate()
            .is_err());

        let config = ExchangeConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ExchangeConfig =
            serde_json::from_str(r#"{"token_endpoint": "http://localhost:8080/token"}"#).unwrap();
        assert_eq!(config.token_endpoint, "http://localhost:8080/token");
        assert_eq!(config.timeout_secs, 30);

        let result: Result<ExchangeConfig, _> = serde_json::from_str(r#"{"endpoint": "x"}"#);
        assert!(result.is_err());
    }
}

//! Token endpoint client.

use std::fmt;
use std::time::Instant;

use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::{ExchangeConfig, GRANT_TYPE_TOKEN_EXCHANGE, TOKEN_TYPE_JWT};
use crate::assertion::IdentityAssertion;
use crate::error::{ExchangeFailure, IssueError, OAuthErrorBody, Result};

/// Error bodies longer than this are cut before being stored in the error.
const MAX_ERROR_BODY_LEN: usize = 1024;

/// Opaque bearer token returned by the token endpoint.
///
/// Passed through exactly as received.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

/// Successful token endpoint response (RFC 6749 section 5.1, RFC 8693 section 2.2.1).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    issued_token_type: Option<String>,
}

/// Client side of the RFC 8693 token exchange.
///
/// Holds only the HTTP client and the endpoint; every call to
/// [`exchange`](Self::exchange) is independent, so one instance can be shared
/// between concurrent callers.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl TokenExchanger {
    /// Create a new exchanger from configuration.
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let endpoint = config.validate().map_err(|e| {
            IssueError::exchange(config.token_endpoint.as_str(), ExchangeFailure::Client(e))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                IssueError::exchange(
                    config.token_endpoint.as_str(),
                    ExchangeFailure::Client(format!("Failed to create HTTP client: {}", e)),
                )
            })?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// Token endpoint this exchanger talks to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Exchange a signed assertion for an access token.
    ///
    /// Sends exactly one request. Cancelling `cancel` aborts it and yields
    /// [`ExchangeFailure::Cancelled`].
    pub async fn exchange(
        &self,
        assertion: &IdentityAssertion,
        cancel: &CancellationToken,
    ) -> Result<AccessToken> {
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExchangeFailure::Cancelled),
            outcome = self.send(assertion.as_str()) => outcome,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(token) => {
                info!(
                    endpoint = %self.endpoint,
                    iss = %assertion.claims().iss,
                    elapsed_ms,
                    "Token exchange successful"
                );
                Ok(token)
            }
            Err(cause) => {
                warn!(
                    endpoint = %self.endpoint,
                    iss = %assertion.claims().iss,
                    elapsed_ms,
                    error = %cause,
                    "Token exchange failed"
                );
                Err(IssueError::exchange(self.endpoint.as_str(), cause))
            }
        }
    }

    async fn send(&self, subject_token: &str) -> std::result::Result<AccessToken, ExchangeFailure> {
        let form = [
            ("grant_type", GRANT_TYPE_TOKEN_EXCHANGE),
            ("subject_token", subject_token),
            ("subject_token_type", TOKEN_TYPE_JWT),
        ];

        debug!(endpoint = %self.endpoint, "Sending token exchange request");

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let (text, read_error) = read_error_body(response).await;
            let oauth_error = serde_json::from_str::<OAuthErrorBody>(&text).ok();

            let mut body = truncate_body(&text);
            if let Some(e) = read_error {
                warn!(status = %status, error = %e, "Failed to read error response body");
                body.push_str(&format!(" [body read failed: {}]", e));
            }

            return Err(ExchangeFailure::Status {
                status,
                body,
                oauth_error,
            });
        }

        let body = response.bytes().await.map_err(classify_transport)?;
        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| ExchangeFailure::MalformedResponse(e.to_string()))?;

        if parsed.access_token.is_empty() {
            return Err(ExchangeFailure::MalformedResponse(
                "access_token is empty".to_string(),
            ));
        }

        debug!(
            status = %status,
            token_type = ?parsed.token_type,
            expires_in = ?parsed.expires_in,
            issued_token_type = ?parsed.issued_token_type,
            "Received token response"
        );

        Ok(AccessToken(parsed.access_token))
    }
}

fn classify_transport(err: reqwest::Error) -> ExchangeFailure {
    if err.is_timeout() {
        ExchangeFailure::Timeout
    } else {
        ExchangeFailure::Transport(err)
    }
}

/// Read an error body, stopping once more than `MAX_ERROR_BODY_LEN` bytes
/// have arrived. A failed read keeps whatever was received before it.
async fn read_error_body(mut response: reqwest::Response) -> (String, Option<reqwest::Error>) {
    let mut collected = Vec::new();
    let read_error = loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                collected.extend_from_slice(&chunk);
                if collected.len() > MAX_ERROR_BODY_LEN {
                    break None;
                }
            }
            Ok(None) => break None,
            Err(e) => break Some(e),
        }
    };
    (String::from_utf8_lossy(&collected).into_owned(), read_error)
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LEN {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let err = TokenExchanger::new(&ExchangeConfig::with_endpoint("not a url")).unwrap_err();
        assert!(!err.is_retryable());
        match err {
            IssueError::Exchange { endpoint, cause } => {
                assert_eq!(endpoint, "not a url");
                assert!(matches!(cause, ExchangeFailure::Client(_)));
            }
            other => panic!("expected Exchange error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_keeps_endpoint() {
        let exchanger =
            TokenExchanger::new(&ExchangeConfig::with_endpoint("http://127.0.0.1:9/token")).unwrap();
        assert_eq!(exchanger.endpoint().as_str(), "http://127.0.0.1:9/token");
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");

        let long = "é".repeat(MAX_ERROR_BODY_LEN);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= MAX_ERROR_BODY_LEN + 3);
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken("abc123".to_string());
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
        assert_eq!(token.as_str(), "abc123");
    }

    #[test]
    fn test_token_response_parsing() {
        let parsed: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc123","token_type":"Bearer","expires_in":3600,"scope":"api"}"#,
        )
        .unwrap();
        assert_eq!(parsed.access_token, "abc123");
        assert_eq!(parsed.expires_in, Some(3600));

        assert!(serde_json::from_str::<TokenResponse>(r#"{"token_type":"Bearer"}"#).is_err());
    }
}

//! Error types for access-token issuance.
//!
//! Every stage of the pipeline returns [`IssueError`]. Configuration problems
//! (unreadable key, bad key, wrong password) and environmental problems
//! (endpoint unreachable, exchange rejected) are separate variants so callers
//! can decide whether a retry makes sense.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = IssueError> = std::result::Result<T, E>;

/// Access-token issuance errors.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IssueError {
    /// Private key material could not be read from its source.
    #[error("read failure: {}: {source}", .path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// PEM content is not a parseable RSA private key.
    #[error("Invalid private key format: {0}")]
    KeyFormat(String),

    /// Password missing or incorrect for an encrypted key, or the encrypted
    /// key is corrupt.
    #[error("Private key decryption failed: {0}")]
    KeyDecryption(String),

    /// The identity assertion could not be signed.
    #[error("Failed to sign identity assertion: {0}")]
    Signing(String),

    /// The round-trip to the token endpoint failed.
    #[error("Token exchange with {endpoint} failed: {cause}")]
    Exchange {
        /// Token endpoint URL the request was sent to.
        endpoint: String,
        /// What went wrong.
        #[source]
        cause: ExchangeFailure,
    },
}

impl IssueError {
    pub(crate) fn exchange(endpoint: impl Into<String>, cause: ExchangeFailure) -> Self {
        Self::Exchange {
            endpoint: endpoint.into(),
            cause,
        }
    }

    /// Whether repeating the call (with a freshly built assertion) may succeed.
    ///
    /// Only exchange failures are potentially transient. Key and signing
    /// failures need a fix to the input first, and so does an exchanger
    /// that could not be built ([`ExchangeFailure::Client`]).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Exchange { cause, .. } => !matches!(cause, ExchangeFailure::Client(_)),
            _ => false,
        }
    }

    /// The exchange failure cause, if this is an exchange error.
    pub fn exchange_failure(&self) -> Option<&ExchangeFailure> {
        match self {
            Self::Exchange { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Cause of an [`IssueError::Exchange`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExchangeFailure {
    /// Connection, TLS or protocol failure before a response was read.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The caller cancelled the in-flight request.
    #[error("request cancelled")]
    Cancelled,

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}{}", describe_body(.body, .oauth_error.as_ref()))]
    Status {
        /// HTTP status returned by the endpoint.
        status: StatusCode,
        /// Response body, truncated.
        body: String,
        /// Parsed OAuth 2.0 error object, when the body carried one.
        oauth_error: Option<OAuthErrorBody>,
    },

    /// A 2xx response whose body is not a usable token response.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// The exchanger could not be constructed: invalid endpoint or HTTP
    /// client setup failure. Not retryable.
    #[error("client setup failed: {0}")]
    Client(String),
}

/// Error object of an OAuth 2.0 token endpoint (RFC 6749 section 5.2).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct OAuthErrorBody {
    /// Error code, e.g. `invalid_grant`.
    pub error: String,
    /// Human-readable description.
    #[serde(default)]
    pub error_description: Option<String>,
}

fn describe_body(body: &str, oauth_error: Option<&OAuthErrorBody>) -> String {
    match oauth_error {
        Some(OAuthErrorBody {
            error,
            error_description: Some(description),
        }) => format!(" ({error}: {description})"),
        Some(OAuthErrorBody { error, .. }) => format!(" ({error})"),
        None if body.is_empty() => String::new(),
        None => format!(": {body}"),
    }
}

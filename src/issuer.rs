//! Access token issuance pipeline.
//!
//! Key Loader -> Assertion Builder -> Token Exchanger, run once per call.
//! Nothing is kept between calls: each issuance loads the key again and signs
//! a fresh assertion.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::assertion::build_assertion;
use crate::error::Result;
use crate::exchange::{AccessToken, ExchangeConfig, TokenExchanger};
use crate::key::PrivateKeyMaterial;

/// Inputs for one issuance call.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// Private key and password.
    pub key: PrivateKeyMaterial,
    /// Caller identity placed in the `iss` claim.
    pub issuer: String,
}

impl IssueRequest {
    pub fn new(key: PrivateKeyMaterial, issuer: impl Into<String>) -> Self {
        Self {
            key,
            issuer: issuer.into(),
        }
    }
}

/// Issues access tokens against one token endpoint.
///
/// Cheap to clone and safe to share: `issue` takes `&self` and keeps no
/// per-call state.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    exchanger: TokenExchanger,
}

impl CredentialIssuer {
    /// Create an issuer for the configured endpoint.
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        Ok(Self {
            exchanger: TokenExchanger::new(config)?,
        })
    }

    /// Create an issuer around an existing exchanger.
    pub fn with_exchanger(exchanger: TokenExchanger) -> Self {
        Self { exchanger }
    }

    pub fn exchanger(&self) -> &TokenExchanger {
        &self.exchanger
    }

    /// Obtain an access token.
    ///
    /// Key and signing failures return before any network request is made.
    pub async fn issue(
        &self,
        request: &IssueRequest,
        cancel: &CancellationToken,
    ) -> Result<AccessToken> {
        issue_with(&self.exchanger, request, cancel).await
    }
}

/// One-shot issuance: build an exchanger from `config` and issue a token.
pub async fn issue_access_token(
    config: &ExchangeConfig,
    request: &IssueRequest,
    cancel: &CancellationToken,
) -> Result<AccessToken> {
    let exchanger = TokenExchanger::new(config)?;
    issue_with(&exchanger, request, cancel).await
}

async fn issue_with(
    exchanger: &TokenExchanger,
    request: &IssueRequest,
    cancel: &CancellationToken,
) -> Result<AccessToken> {
    let key = request.key.load().inspect_err(|e| {
        warn!(iss = %request.issuer, error = %e, "Failed to load private key");
    })?;

    let assertion = build_assertion(&key, &request.issuer).inspect_err(|e| {
        warn!(iss = %request.issuer, error = %e, "Failed to sign identity assertion");
    })?;
    drop(key);

    debug!(
        iss = %request.issuer,
        endpoint = %exchanger.endpoint(),
        "Exchanging identity assertion"
    );

    exchanger.exchange(&assertion, cancel).await
}

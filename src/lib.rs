//! # Zentinel Token Client
//!
//! Obtains short-lived bearer tokens for Zentinel backend APIs.
//!
//! The caller proves its identity with an RSA private key: a one-hour RS256
//! assertion (`iss`, `iat`, `exp`) is signed and exchanged at the token
//! endpoint using the RFC 8693 token-exchange grant.
//!
//! - **Key loading**: PKCS#1, PKCS#8, password-encrypted PKCS#8 and legacy
//!   OpenSSL-encrypted PEM
//! - **Assertion signing**: RS256 via `jsonwebtoken`
//! - **Token exchange**: a single form-encoded POST, cancellable, no retries
//!
//! Nothing is cached. Callers that want token reuse or retries wrap
//! [`CredentialIssuer`] themselves.
//!
//! ## Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use zentinel_token_client::{CredentialIssuer, ExchangeConfig, IssueRequest, PrivateKeyMaterial};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExchangeConfig::default()
//!     .with_endpoint_override(std::env::var("ZENTINEL_TOKEN_ENDPOINT").ok());
//! let issuer = CredentialIssuer::new(&config)?;
//!
//! let key = PrivateKeyMaterial::from_file("/etc/zentinel/client.pem", "")?;
//! let request = IssueRequest::new(key, "my-service");
//!
//! let token = issuer.issue(&request, &CancellationToken::new()).await?;
//! println!("Bearer {}", token.as_str());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod assertion;
pub mod error;
pub mod exchange;
pub mod issuer;
pub mod key;

pub use assertion::{build_assertion, IdentityAssertion};
pub use error::{ExchangeFailure, IssueError, OAuthErrorBody, Result};
pub use exchange::{AccessToken, ExchangeConfig, TokenExchanger, DEFAULT_TOKEN_ENDPOINT};
pub use issuer::{issue_access_token, CredentialIssuer, IssueRequest};
pub use key::{load_private_key, KeyPassword, ParsedPrivateKey, PrivateKeyMaterial};

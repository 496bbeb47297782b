//! Assertion builder for the token-exchange subject token.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IssueError, Result};
use crate::key::ParsedPrivateKey;

/// Assertion lifetime: `exp` is always `iat` plus this many seconds.
pub const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Claims carried by an identity assertion.
///
/// The token endpoint expects exactly these three claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer: the caller's identity.
    pub iss: String,
    /// Issued at (Unix seconds).
    pub iat: u64,
    /// Expiration time (Unix seconds).
    pub exp: u64,
}

/// A signed assertion, ready to be sent once as a subject token.
#[derive(Clone)]
pub struct IdentityAssertion {
    token: String,
    claims: AssertionClaims,
}

impl IdentityAssertion {
    /// Compact serialization (`header.payload.signature`).
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &AssertionClaims {
        &self.claims
    }
}

impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAssertion")
            .field("token", &"***")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Build and sign an assertion issued now.
pub fn build_assertion(key: &ParsedPrivateKey, issuer: &str) -> Result<IdentityAssertion> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| IssueError::Signing(format!("System clock is before the Unix epoch: {}", e)))?;

    build_assertion_at(key, issuer, now)
}

/// Build and sign an assertion with an explicit `iat`.
///
/// Fails with [`IssueError::Signing`] when `iat + 3600` does not fit in a `u64`.
pub fn build_assertion_at(
    key: &ParsedPrivateKey,
    issuer: &str,
    issued_at: u64,
) -> Result<IdentityAssertion> {
    let exp = issued_at.checked_add(ASSERTION_LIFETIME_SECS).ok_or_else(|| {
        IssueError::Signing(format!("Issue time {} is out of range", issued_at))
    })?;

    let claims = AssertionClaims {
        iss: issuer.to_string(),
        iat: issued_at,
        exp,
    };

    let der = key.to_pkcs1_der()?;
    let encoding_key = EncodingKey::from_rsa_der(&der);

    let header = Header::new(Algorithm::RS256);
    let token = encode(&header, &claims, &encoding_key)
        .map_err(|e| IssueError::Signing(format!("Failed to encode assertion: {}", e)))?;

    debug!(
        iss = %claims.iss,
        iat = claims.iat,
        exp = claims.exp,
        "Signed identity assertion"
    );

    Ok(IdentityAssertion { token, claims })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{load_private_key, KeyPassword};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};

    const PKCS1_PEM: &str = include_str!("../../tests/fixtures/rsa_2048_pkcs1.pem");
    const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/rsa_2048_public.pem");

    fn test_key() -> ParsedPrivateKey {
        load_private_key(PKCS1_PEM, &KeyPassword::Unencrypted).unwrap()
    }

    fn payload_json(token: &str) -> serde_json::Value {
        let payload = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn test_expiry_is_one_hour_after_issuance() {
        let assertion = build_assertion(&test_key(), "test-issuer").unwrap();
        let claims = assertion.claims();
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_claims_are_exactly_iss_iat_exp() {
        let assertion = build_assertion_at(&test_key(), "test-issuer", 1_700_000_000).unwrap();
        let payload = payload_json(assertion.as_str());

        assert_eq!(
            payload,
            serde_json::json!({
                "iss": "test-issuer",
                "iat": 1_700_000_000u64,
                "exp": 1_700_003_600u64,
            })
        );
    }

    #[test]
    fn test_issue_time_overflow_is_signing_error() {
        let result = build_assertion_at(&test_key(), "test-issuer", u64::MAX - 10);
        assert!(matches!(result, Err(IssueError::Signing(_))));
    }

    #[test]
    fn test_header_is_rs256() {
        let assertion = build_assertion(&test_key(), "test-issuer").unwrap();
        let header = decode_header(assertion.as_str()).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(assertion.as_str().split('.').count(), 3);
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let assertion = build_assertion(&test_key(), "https://svc.example.com/a b?c=d&e").unwrap();

        let decoding_key = DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&["https://svc.example.com/a b?c=d&e"]);
        validation.validate_aud = false;

        let data = decode::<AssertionClaims>(assertion.as_str(), &decoding_key, &validation).unwrap();
        assert_eq!(&data.claims, assertion.claims());
    }

    #[test]
    fn test_debug_redacts_token() {
        let assertion = build_assertion(&test_key(), "test-issuer").unwrap();
        let rendered = format!("{:?}", assertion);
        assert!(!rendered.contains(assertion.as_str()));
        assert!(rendered.contains("test-issuer"));
    }
}

//! Signed identity assertions.
//!
//! A compact RS256 JWT with `iss`, `iat` and `exp` claims that proves the
//! caller's identity to the token endpoint.

pub mod builder;

pub use builder::{
    build_assertion, build_assertion_at, AssertionClaims, IdentityAssertion,
    ASSERTION_LIFETIME_SECS,
};

//! Token Exchange client (RFC 8693).
//!
//! Presents a signed identity assertion as a JWT subject token and returns
//! the access token issued for it.

pub mod client;
pub mod config;

pub use client::{AccessToken, TokenExchanger};
pub use config::{ExchangeConfig, DEFAULT_TOKEN_ENDPOINT, GRANT_TYPE_TOKEN_EXCHANGE, TOKEN_TYPE_JWT};

//! Zentinel Token Client
//!
//! Issues a bearer access token for the Zentinel backend API and prints it
//! on stdout. Logs go to stderr as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use zentinel_token_client::{
    CredentialIssuer, ExchangeConfig, IssueRequest, PrivateKeyMaterial, DEFAULT_TOKEN_ENDPOINT,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "zentinel-token-client")]
#[command(about = "Exchange a signed identity assertion for a Zentinel access token")]
struct Args {
    /// Path to the PEM-encoded RSA private key
    #[arg(long, env = "ZENTINEL_PRIVATE_KEY_FILE")]
    key_file: PathBuf,

    /// Password for an encrypted private key (empty for unencrypted keys)
    #[arg(long, default_value = "", env = "ZENTINEL_PRIVATE_KEY_PASSWORD", hide_env_values = true)]
    key_password: String,

    /// Issuer identity placed in the assertion
    #[arg(long, env = "ZENTINEL_ISSUER")]
    issuer: String,

    /// Token endpoint URL
    #[arg(long, default_value = DEFAULT_TOKEN_ENDPOINT, env = "ZENTINEL_TOKEN_ENDPOINT")]
    token_endpoint: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, env = "ZENTINEL_TOKEN_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long, env = "ZENTINEL_VERBOSE")]
    verbose: bool,
}

impl Args {
    fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            timeout_secs: self.timeout_secs,
            ..Default::default()
        }
        .with_endpoint_override(Some(self.token_endpoint.clone()))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("{}={}", env!("CARGO_CRATE_NAME"), log_level))
        .with_writer(std::io::stderr)
        .json()
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Token issuance failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.exchange_config();
    info!(endpoint = %config.token_endpoint, iss = %args.issuer, "Requesting access token");

    let issuer = CredentialIssuer::new(&config).context("Invalid token endpoint configuration")?;

    let key = PrivateKeyMaterial::from_file(&args.key_file, &args.key_password)
        .context("Failed to read private key")?;
    let request = IssueRequest::new(key, args.issuer);

    // Ctrl-C aborts the in-flight exchange
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling token exchange");
            signal_cancel.cancel();
        }
    });

    let token = issuer
        .issue(&request, &cancel)
        .await
        .context("Failed to obtain access token")?;

    println!("{}", token.as_str());
    Ok(())
}

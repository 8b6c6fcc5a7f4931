//! lti-admin: operator tooling for LTI launch authentication
//!
//! - `generate-credential` prints a fresh consumer key/secret pair
//! - `sign` signs a launch the way a tool consumer would
//! - `verify` replays a captured launch against a consumers file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use lti_launch_auth::{
    generate_token, sign_request, AuthenticatedLaunch, ConsumerRecord, FixedClock,
    InMemoryCredentialStore, InMemoryNonceStore, LaunchAuthConfig, LaunchAuthenticationApi,
    LaunchAuthenticator, LaunchOutcome, LaunchRequest, SignatureMethod, SystemClock, TimeSource,
};

/// lti-admin: LTI launch authentication operator tool
#[derive(Parser, Debug)]
#[command(name = "lti-admin")]
#[command(about = "Generate credentials, sign and verify LTI launches")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a new consumer key and secret as JSON
    GenerateCredential,

    /// Sign a launch and print the form body
    Sign {
        /// Launch URL; query parameters are signed but stay in the URL, not the body
        #[arg(long)]
        url: String,

        /// Consumer key
        #[arg(long)]
        key: String,

        /// Consumer secret
        #[arg(long)]
        secret: String,

        /// HTTP method
        #[arg(long, default_value = "POST")]
        method: String,

        /// Extra launch parameter as name=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// oauth_nonce; random if omitted
        #[arg(long)]
        nonce: Option<String>,

        /// oauth_timestamp; current time if omitted
        #[arg(long)]
        timestamp: Option<i64>,

        /// oauth_signature_method
        #[arg(long, default_value = "HMAC-SHA1")]
        signature_method: String,
    },

    /// Verify a captured launch body and print the outcome as JSON
    Verify {
        /// TOML file with [[consumers]] entries
        #[arg(long)]
        consumers: PathBuf,

        /// Launch auth config (TOML); defaults if omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Launch URL the body was posted to
        #[arg(long)]
        url: String,

        /// HTTP method
        #[arg(long, default_value = "POST")]
        method: String,

        /// Form-encoded body
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,

        /// File holding the form-encoded body
        #[arg(long)]
        body_file: Option<PathBuf>,

        /// Unix time to verify at; system clock if omitted
        #[arg(long)]
        now: Option<i64>,
    },
}

#[derive(Debug, Deserialize)]
struct ConsumersFile {
    #[serde(default)]
    consumers: Vec<ConsumerRecord>,
}

#[derive(Debug, Serialize)]
struct GeneratedCredential {
    consumer_key: String,
    consumer_secret: String,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    launch: Option<AuthenticatedLaunch>,
}

impl From<LaunchOutcome> for VerifyReport {
    fn from(outcome: LaunchOutcome) -> Self {
        match outcome {
            LaunchOutcome::Accepted(launch) => Self {
                accepted: true,
                reason: None,
                status: 200,
                message: None,
                launch: Some(launch),
            },
            LaunchOutcome::Rejected { reason } => Self {
                accepted: false,
                reason: Some(reason.code()),
                status: reason.http_status(),
                message: Some(reason.user_message()),
                launch: None,
            },
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::GenerateCredential => generate_credential(),
        Command::Sign {
            url,
            key,
            secret,
            method,
            params,
            nonce,
            timestamp,
            signature_method,
        } => {
            let method_kind: SignatureMethod = signature_method
                .parse()
                .map_err(|_| anyhow::anyhow!("Unsupported signature method `{signature_method}`"))?;
            let body = sign(SignInput {
                url: &url,
                key: &key,
                secret: &secret,
                method: &method,
                params,
                nonce,
                timestamp,
                signature_method: method_kind,
            })?;
            println!("{body}");
            Ok(())
        }
        Command::Verify {
            consumers,
            config,
            url,
            method,
            body,
            body_file,
            now,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read body from {}", path.display()))?,
                (None, None) => bail!("Either --body or --body-file is required"),
            };
            let report = verify(&consumers, config.as_deref(), &method, &url, &body, now).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn generate_credential() -> Result<()> {
    let (consumer_key, consumer_secret) = InMemoryCredentialStore::new()
        .generate_credential()
        .context("Failed to generate credentials")?;

    let credential = GeneratedCredential {
        consumer_key,
        consumer_secret,
    };
    println!("{}", serde_json::to_string_pretty(&credential)?);
    Ok(())
}

struct SignInput<'a> {
    url: &'a str,
    key: &'a str,
    secret: &'a str,
    method: &'a str,
    params: Vec<(String, String)>,
    nonce: Option<String>,
    timestamp: Option<i64>,
    signature_method: SignatureMethod,
}

fn sign(input: SignInput<'_>) -> Result<String> {
    let nonce = input.nonce.unwrap_or_else(|| generate_token()[..32].to_string());
    let timestamp = input.timestamp.unwrap_or_else(|| SystemClock::new().now());

    let mut request = LaunchRequest::new(input.method.to_ascii_uppercase(), input.url, input.params)
        .with_param("oauth_consumer_key", input.key)
        .with_param("oauth_nonce", nonce)
        .with_param("oauth_timestamp", timestamp.to_string())
        .with_param("oauth_version", "1.0");

    sign_request(&mut request, input.secret, input.signature_method)
        .with_context(|| format!("Cannot sign launch for {}", input.url))?;
    debug!(url = input.url, "Signed launch");
    Ok(request.to_form_body())
}

async fn verify(
    consumers: &std::path::Path,
    config: Option<&std::path::Path>,
    method: &str,
    url: &str,
    body: &str,
    now: Option<i64>,
) -> Result<VerifyReport> {
    let mut config = match config {
        Some(path) => LaunchAuthConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LaunchAuthConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;

    let raw = std::fs::read_to_string(consumers)
        .with_context(|| format!("Failed to read consumers from {}", consumers.display()))?;
    let file: ConsumersFile = toml::from_str(&raw).context("Failed to parse consumers file")?;
    let store = InMemoryCredentialStore::from_records(file.consumers)
        .context("Invalid consumers file")?;
    info!(consumers = store.len(), "Loaded consumers");

    let clock = Arc::new(FixedClock::new(
        now.unwrap_or_else(|| SystemClock::new().now()),
    ));
    let authenticator =
        LaunchAuthenticator::new(&config, store, InMemoryNonceStore::new(), clock);

    let request = LaunchRequest::from_form(method.to_ascii_uppercase(), url, body.as_bytes());
    Ok(authenticator.verify(&request).await.into())
}

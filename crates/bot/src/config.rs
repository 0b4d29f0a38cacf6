//! Bot configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STATE_URL` - Where the state blob lives (`file:///...` or `s3://bucket/key`)
//! - `SLACK_API_TOKEN` - Slack bot token (xoxb-...)
//! - `SLACK_SIGNING_SECRET` - Slack app signing secret
//!
//! ## Optional
//! - `PICKEM_HOST` - Bind address (default: 127.0.0.1)
//! - `PICKEM_PORT` - Listen port (default: 3000)
//! - `PICKEM_LOG_JSON` - Emit JSON logs when set
//! - `SLACK_API_BASE` - Slack Web API base URL (default: <https://slack.com/api>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## S3 (read when `STATE_URL` is an `s3://` location)
//! - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` - Static keys; both or neither.
//!   Without them the AWS default credential chain applies (profile, web
//!   identity, ECS or instance metadata).
//! - `AWS_SESSION_TOKEN` - Optional, for temporary static credentials
//! - `AWS_REGION` - Default: us-east-1
//! - `S3_ENDPOINT` - Optional path-style endpoint for S3-compatible stores

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use pickem_core::StoreError;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::store::StateLocation;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid STATE_URL: {0}")]
    Location(#[from] StoreError),
}

/// Bot application configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Where the state blob lives
    pub state_location: StateLocation,
    /// S3 settings, present for `s3://` locations
    pub s3: Option<S3Config>,
    /// Slack Web API configuration
    pub slack: SlackConfig,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

/// Slack Web API configuration.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct SlackConfig {
    /// Slack bot token (xoxb-...).
    pub api_token: SecretString,
    /// Slack app signing secret for webhook verification.
    pub signing_secret: SecretString,
    /// Web API base URL.
    pub api_base: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("api_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// S3 addressing and optional static credentials.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Static keys; `None` defers to the AWS default credential chain
    pub credentials: Option<StaticCredentials>,
    /// Signing region
    pub region: String,
    /// Path-style endpoint override (S3-compatible stores)
    pub endpoint: Option<Url>,
}

/// Access keys taken from the environment.
///
/// Implements `Debug` manually to redact the secret key and session token.
#[derive(Clone)]
pub struct StaticCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: SecretString,
    /// Session token for temporary credentials
    pub session_token: Option<SecretString>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&process_env)
    }

    /// Load configuration through `env`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = get_env_or_default(env, "PICKEM_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PICKEM_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default(env, "PICKEM_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PICKEM_PORT".to_string(), e.to_string()))?;

        let state_location: StateLocation = get_required_env(env, "STATE_URL")?.parse()?;
        let s3 = match state_location {
            StateLocation::S3 { .. } => Some(S3Config::from_lookup(env)?),
            StateLocation::File(_) => None,
        };

        Ok(Self {
            host,
            port,
            state_location,
            s3,
            slack: SlackConfig::from_lookup(env)?,
            log_json: env("PICKEM_LOG_JSON").is_some(),
            sentry_dsn: env("SENTRY_DSN"),
            sentry_environment: env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SlackConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_token = get_required_env(env, "SLACK_API_TOKEN")?;
        let signing_secret = get_required_env(env, "SLACK_SIGNING_SECRET")?;

        // Weak secrets are reported, not rejected
        if let Err(e) = validate_secret_strength(&signing_secret, "SLACK_SIGNING_SECRET") {
            tracing::warn!("SLACK_SIGNING_SECRET validation warning: {e}");
        }

        Ok(Self {
            api_token: SecretString::from(api_token),
            signing_secret: SecretString::from(signing_secret),
            api_base: get_env_or_default(env, "SLACK_API_BASE", DEFAULT_SLACK_API_BASE),
        })
    }
}

impl S3Config {
    /// Load S3 settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if only one half of the static key pair is set,
    /// or `S3_ENDPOINT` is not a URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = env("S3_ENDPOINT")
            .map(|raw| {
                Url::parse(&raw)
                    .map_err(|e| ConfigError::InvalidEnvVar("S3_ENDPOINT".to_string(), e.to_string()))
            })
            .transpose()?;

        let credentials = match (env("AWS_ACCESS_KEY_ID"), env("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key: SecretString::from(secret_access_key),
                session_token: env("AWS_SESSION_TOKEN").map(SecretString::from),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar("AWS_SECRET_ACCESS_KEY".to_string()));
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar("AWS_ACCESS_KEY_ID".to_string()));
            }
        };

        Ok(Self {
            credentials,
            region: get_env_or_default(env, "AWS_REGION", DEFAULT_AWS_REGION),
            endpoint,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Read a variable from the process environment.
fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get a required environment variable.
fn get_required_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    env(key).unwrap_or_else(|| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Check that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InvalidEnvVar(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

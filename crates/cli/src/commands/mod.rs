//! CLI command implementations.
//!
//! Each command runs one repository operation against the configured state
//! blob and returns the text to print.

pub mod channel;
pub mod show;

use pickem_bot::config::{ConfigError, S3Config};
use pickem_bot::store::{LocationStore, StateLocation};
use pickem_core::{CodecError, StoreError};
use thiserror::Error;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Could not render state: {0}")]
    Render(#[from] CodecError),

    #[error("Could not render state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Open the store for `location`, reading S3 settings from the environment
/// when the location needs them.
///
/// # Errors
///
/// Returns `CliError` if the S3 settings are incomplete.
pub async fn open_store(location: &StateLocation) -> Result<LocationStore, CliError> {
    let s3 = match location {
        StateLocation::S3 { .. } => Some(S3Config::from_env()?),
        StateLocation::File(_) => None,
    };

    tracing::debug!(%location, "Opening state store");
    Ok(LocationStore::open(location, s3.as_ref()).await?)
}

//! Durable state transports.
//!
//! The state blob lives at a single location given as a URL:
//!
//! ```text
//! file:///var/lib/pickem/state.json   - local file
//! s3://bucket/path/to/state.json      - S3 (or S3-compatible) object
//! ```
//!
//! [`LocationStore`] picks the transport for a [`StateLocation`] and
//! implements [`StateStore`] by delegating to it.

mod file;
mod s3;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use pickem_core::{PickemState, StateStore, StoreError};

use crate::config::S3Config;

pub use file::FileStore;
pub use s3::S3Store;

/// Where the state blob lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateLocation {
    /// A file on the local filesystem.
    File(PathBuf),
    /// An object in a bucket.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Object key, without a leading slash.
        key: String,
    },
}

impl FromStr for StateLocation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || StoreError::UnsupportedLocation(s.to_string());
        let url = url::Url::parse(s).map_err(|_| unsupported())?;

        match url.scheme() {
            "file" => url.to_file_path().map(Self::File).map_err(|()| unsupported()),
            "s3" => {
                let bucket = url.host_str().filter(|b| !b.is_empty()).ok_or_else(unsupported)?;
                let key = url.path().trim_start_matches('/');
                if key.is_empty() {
                    return Err(unsupported());
                }
                let key = urlencoding::decode(key).map_err(|_| unsupported())?;
                Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    key: key.into_owned(),
                })
            }
            _ => Err(unsupported()),
        }
    }
}

impl fmt::Display for StateLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file://{}", path.display()),
            Self::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// The store for a configured location.
#[derive(Debug, Clone)]
pub enum LocationStore {
    /// Local file transport.
    File(FileStore),
    /// S3 transport.
    S3(S3Store),
}

impl LocationStore {
    /// Open the transport for `location`.
    ///
    /// S3 locations need an `s3` config, which resolves the SDK client.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotReadable` for an S3 location without an S3
    /// config.
    pub async fn open(
        location: &StateLocation,
        s3: Option<&S3Config>,
    ) -> Result<Self, StoreError> {
        match location {
            StateLocation::File(path) => Ok(Self::File(FileStore::new(path.clone()))),
            StateLocation::S3 { bucket, key } => {
                let config = s3.ok_or_else(|| StoreError::NotReadable {
                    location: location.to_string(),
                    reason: "S3 is not configured".to_string(),
                })?;
                Ok(Self::S3(
                    S3Store::connect(config, bucket.clone(), key.clone()).await,
                ))
            }
        }
    }
}

impl StateStore for LocationStore {
    async fn load(&self) -> Result<PickemState, StoreError> {
        match self {
            Self::File(store) => store.load().await,
            Self::S3(store) => store.load().await,
        }
    }

    async fn save(&self, state: &PickemState) -> Result<(), StoreError> {
        match self {
            Self::File(store) => store.save(state).await,
            Self::S3(store) => store.save(state).await,
        }
    }
}

//! The whole-blob persistence contract.
//!
//! A [`StateStore`] loads and saves the entire [`PickemState`] at once. There
//! is no keyed access: every repository operation loads everything, touches
//! one channel, and writes everything back.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::codec;
use crate::state::PickemState;

/// Errors that can occur while loading or saving state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage medium is unreachable or access was denied.
    #[error("state at {location} is not readable: {reason}")]
    NotReadable {
        /// Where the read was attempted.
        location: String,
        /// What went wrong.
        reason: String,
    },

    /// The stored bytes could not be decoded.
    #[error("state at {location} is malformed: {source}")]
    Malformed {
        /// Where the bytes came from.
        location: String,
        /// The decode failure.
        #[source]
        source: codec::CodecError,
    },

    /// The location uses a scheme no transport understands.
    #[error("unsupported state location: {0}")]
    UnsupportedLocation(String),

    /// Writing to the storage medium failed.
    #[error("failed to write state to {location}: {reason}")]
    WriteFailed {
        /// Where the write was attempted.
        location: String,
        /// What went wrong.
        reason: String,
    },
}

/// Durable storage for the state aggregate.
///
/// Implementations must treat `save` as a full replacement: after it
/// succeeds, durable state equals the state passed in.
pub trait StateStore: Send + Sync {
    /// Load the stored state, or an empty state if nothing is stored yet.
    fn load(&self) -> impl Future<Output = Result<PickemState, StoreError>> + Send;

    /// Replace the stored state with `state`.
    fn save(&self, state: &PickemState) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: StateStore> StateStore for &S {
    fn load(&self) -> impl Future<Output = Result<PickemState, StoreError>> + Send {
        (**self).load()
    }

    fn save(&self, state: &PickemState) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).save(state)
    }
}

impl<S: StateStore> StateStore for std::sync::Arc<S> {
    fn load(&self) -> impl Future<Output = Result<PickemState, StoreError>> + Send {
        (**self).load()
    }

    fn save(&self, state: &PickemState) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).save(state)
    }
}

/// In-process store holding the encoded blob.
///
/// Every load and save goes through the codec, so behavior matches the
/// durable transports byte for byte. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    const LOCATION: &'static str = "memory";

    /// An empty store, as if nothing had been saved yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `state`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the state cannot be encoded.
    pub fn with_state(state: &PickemState) -> Result<Self, StoreError> {
        let store = Self::new();
        store.put(state)?;
        Ok(store)
    }

    /// A store holding raw bytes, which may or may not decode.
    #[must_use]
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: Mutex::new(Some(bytes.into())),
            saves: Mutex::new(0),
        }
    }

    /// The stored bytes, if anything has been stored.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.blob
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Decode the stored bytes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Malformed` if the stored bytes do not decode.
    pub fn state(&self) -> Result<PickemState, StoreError> {
        let bytes = self.snapshot().unwrap_or_default();
        codec::decode(&bytes).map_err(|source| StoreError::Malformed {
            location: Self::LOCATION.to_owned(),
            source,
        })
    }

    /// How many times `save` has succeeded.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put(&self, state: &PickemState) -> Result<(), StoreError> {
        let bytes = codec::encode(state).map_err(|e| StoreError::WriteFailed {
            location: Self::LOCATION.to_owned(),
            reason: e.to_string(),
        })?;
        *self.blob.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
        Ok(())
    }
}

impl StateStore for MemoryStore {
    async fn load(&self) -> Result<PickemState, StoreError> {
        self.state()
    }

    async fn save(&self, state: &PickemState) -> Result<(), StoreError> {
        self.put(state)?;
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

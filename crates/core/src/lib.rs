//! Pickem Core - fair per-channel user rotation.
//!
//! This crate holds everything the bot and CLI share:
//! - `bot` - Slack slash-command server
//! - `cli` - Operator tooling against the same state blob
//!
//! # Architecture
//!
//! The core crate owns the data model, the selection algorithm and the
//! persistence *contract*. It performs no network or filesystem I/O; durable
//! transports live in `pickem-bot` and implement [`StateStore`].
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user/channel ids and the sample size
//! - [`state`] - Per-channel pick history and the aggregate that owns it
//! - [`codec`] - JSON encoding of the aggregate
//! - [`store`] - The `StateStore` trait and an in-memory implementation
//! - [`select`] - The fairness algorithm as pure functions
//! - [`repository`] - Load, mutate, save operations over a store

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod codec;
pub mod repository;
pub mod select;
pub mod state;
pub mod store;
pub mod types;

pub use codec::CodecError;
pub use repository::PickemRepository;
pub use state::{ChannelState, NEVER_PICKED, PickedUserState, PickemState};
pub use store::{MemoryStore, StateStore, StoreError};
pub use types::*;

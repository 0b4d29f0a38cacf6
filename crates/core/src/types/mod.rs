//! Core types for Pickem.
//!
//! This module provides type-safe wrappers for chat-platform identifiers
//! and the validated per-channel sample size.

pub mod id;
pub mod sample_size;

pub use id::*;
pub use sample_size::{SampleSize, SampleSizeError};

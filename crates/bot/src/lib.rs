//! Pickem Bot library.
//!
//! This crate provides the Slack slash-command server as a library,
//! allowing it to be tested and reused by the CLI.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`store`] - File and S3 implementations of the state store
//! - [`slack`] - Slack Web API client and signature verification
//! - [`commands`] - Slash-command parsing and dispatch
//! - [`routes`] - HTTP routes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commands;
pub mod config;
pub mod error;
pub mod routes;
pub mod slack;
pub mod state;
pub mod store;

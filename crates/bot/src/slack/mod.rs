//! Slack integration for the slash-command bot.
//!
//! This module provides:
//! - [`SlackClient`] for listing channel members and posting announcements
//! - Webhook signature verification
//! - Wire types for the Web API and slash-command replies

mod client;
mod error;
mod types;

pub use client::SlackClient;
pub use error::SlackError;
pub use types::{
    CommandResponse, ConversationMembersResponse, PostMessage, PostMessageResponse,
    ResponseMetadata,
};

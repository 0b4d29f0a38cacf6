//! Slack Web API and slash-command payload types.
//!
//! These cover only the endpoints the bot calls:
//! `chat.postMessage` and `conversations.members`.
//!
//! See: <https://api.slack.com/methods>

use serde::{Deserialize, Serialize};

/// A plain-text message for `chat.postMessage`.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessage<'a> {
    /// Channel ID to post to.
    pub channel: &'a str,
    /// Message text (mrkdwn).
    pub text: &'a str,
}

/// Reply body for a slash command.
///
/// Ephemeral replies are shown only to the user who ran the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// `ephemeral` or `in_channel`.
    pub response_type: String,
    /// Message text.
    pub text: String,
}

impl CommandResponse {
    /// A reply visible only to the invoking user.
    #[must_use]
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: "ephemeral".to_string(),
            text: text.into(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID where message was posted.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// One page of `conversations.members`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMembersResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Member user IDs on this page.
    #[serde(default)]
    pub members: Vec<String>,
    /// Pagination cursor.
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

impl ConversationMembersResponse {
    /// The cursor for the next page, if there is one.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.as_str())
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Cursor pagination metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    /// Cursor for the next page; empty on the last page.
    #[serde(default)]
    pub next_cursor: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_response_shape() {
        let json = serde_json::to_value(CommandResponse::ephemeral("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"response_type": "ephemeral", "text": "hi"})
        );
    }

    #[test]
    fn test_members_cursor() {
        let page: ConversationMembersResponse = serde_json::from_str(
            r#"{"ok":true,"members":["U1","U2"],"response_metadata":{"next_cursor":"dXNlcjpVMDYxTkZUVDI="}}"#,
        )
        .unwrap();
        assert_eq!(page.members, vec!["U1", "U2"]);
        assert_eq!(page.next_cursor(), Some("dXNlcjpVMDYxTkZUVDI="));

        let last: ConversationMembersResponse = serde_json::from_str(
            r#"{"ok":true,"members":["U3"],"response_metadata":{"next_cursor":""}}"#,
        )
        .unwrap();
        assert_eq!(last.next_cursor(), None);

        let bare: ConversationMembersResponse =
            serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).unwrap();
        assert!(bare.members.is_empty());
        assert_eq!(bare.next_cursor(), None);
        assert_eq!(bare.error.as_deref(), Some("channel_not_found"));
    }
}

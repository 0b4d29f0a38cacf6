//! Durable JSON encoding of [`PickemState`].
//!
//! The blob is an array of channel records:
//!
//! ```json
//! [
//!   {
//!     "channelId": "C0",
//!     "sampleSize": 1,
//!     "excludedUsers": ["U1"],
//!     "pickedUsers": {
//!       "U2": { "userId": "U2", "lastPickedAt": "2024-01-01T00:00:00.123Z" }
//!     }
//!   }
//! ]
//! ```
//!
//! Decoding is lenient where older writers were sloppy: missing collections
//! default to empty, a missing or non-positive `sampleSize` clamps to 1, and
//! an empty blob is an empty state. Encoding is deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{ChannelState, PickedUserState, PickemState};
use crate::types::{ChannelId, SampleSize, UserId};

/// Errors that can occur while encoding or decoding the state blob.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not a valid state document.
    #[error("invalid state document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelRecord {
    channel_id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sample_size: Option<serde_json::Value>,
    #[serde(default)]
    excluded_users: Vec<UserId>,
    #[serde(default)]
    picked_users: BTreeMap<UserId, PickedUserRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickedUserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    last_picked_at: DateTime<Utc>,
}

/// Encode the full state as a JSON document.
///
/// # Errors
///
/// Returns `CodecError::Json` if serialization fails.
pub fn encode(state: &PickemState) -> Result<Vec<u8>, CodecError> {
    let records: Vec<ChannelRecord> = state.channels().map(ChannelRecord::from_state).collect();
    Ok(serde_json::to_vec(&records)?)
}

/// Decode a JSON document into a state.
///
/// # Errors
///
/// Returns `CodecError::Json` if the bytes are not a valid state document.
pub fn decode(bytes: &[u8]) -> Result<PickemState, CodecError> {
    let mut state = PickemState::new();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(state);
    }

    let records: Vec<ChannelRecord> = serde_json::from_slice(bytes)?;
    for record in records {
        // A later record for the same channel replaces an earlier one.
        state.set_channel(record.into_state());
    }
    Ok(state)
}

impl ChannelRecord {
    fn from_state(channel: &ChannelState) -> Self {
        Self {
            channel_id: channel.channel_id().clone(),
            sample_size: Some(serde_json::Value::from(channel.sample_size().get())),
            excluded_users: channel.excluded_users().cloned().collect(),
            picked_users: channel
                .picked_users()
                .map(|picked| {
                    (
                        picked.user_id.clone(),
                        PickedUserRecord {
                            user_id: Some(picked.user_id.clone()),
                            last_picked_at: picked.last_picked_at,
                        },
                    )
                })
                .collect(),
        }
    }

    fn into_state(self) -> ChannelState {
        let sample_size = decode_sample_size(&self.channel_id, self.sample_size.as_ref());
        let mut channel = ChannelState::new(self.channel_id);
        channel.set_sample_size(sample_size);

        for user_id in self.excluded_users {
            channel.exclude_user(user_id);
        }
        for (user_id, picked) in self.picked_users {
            // The map key wins over the embedded id.
            channel.restore_pick(PickedUserState {
                user_id,
                last_picked_at: picked.last_picked_at,
            });
        }
        channel
    }
}

fn decode_sample_size(channel_id: &ChannelId, raw: Option<&serde_json::Value>) -> SampleSize {
    let Some(raw) = raw else {
        return SampleSize::default();
    };

    let parsed = raw
        .as_i64()
        .or_else(|| raw.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)));

    match parsed {
        Some(value) if value >= 1 => SampleSize::clamped(value),
        _ => {
            tracing::warn!(
                channel_id = %channel_id,
                sample_size = %raw,
                "Stored sample size is not a positive integer, using 1"
            );
            SampleSize::ONE
        }
    }
}

//! State inspection.

use pickem_core::{ChannelId, PickemState, StateStore, codec};

use super::CliError;

/// Render the stored state as pretty-printed JSON, optionally narrowed to
/// one channel.
///
/// A channel with no stored record renders as an empty document.
///
/// # Errors
///
/// Returns `CliError` if the state cannot be loaded or rendered.
pub async fn show<S: StateStore>(
    store: &S,
    channel_id: Option<&ChannelId>,
) -> Result<String, CliError> {
    let state = store.load().await?;

    let state = match channel_id {
        Some(channel_id) => {
            let mut narrowed = PickemState::new();
            if let Some(channel) = state.channel(channel_id) {
                narrowed.set_channel(channel.clone());
            }
            narrowed
        }
        None => state,
    };

    let document: serde_json::Value = serde_json::from_slice(&codec::encode(&state)?)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pickem_core::{ChannelState, MemoryStore, SampleSize, UserId};

    use super::*;

    fn seeded_store() -> MemoryStore {
        let mut state = PickemState::new();
        let mut general = ChannelState::new(ChannelId::new("C0"));
        general.exclude_user(UserId::new("U1"));
        general.set_sample_size(SampleSize::new(2).unwrap());
        state.set_channel(general);
        state.set_channel(ChannelState::new(ChannelId::new("C1")));
        MemoryStore::with_state(&state).unwrap()
    }

    #[tokio::test]
    async fn test_show_all_channels() {
        let out = show(&seeded_store(), None).await.unwrap();
        let document: serde_json::Value = serde_json::from_str(&out).unwrap();

        let channels = document.as_array().unwrap();
        assert_eq!(channels.len(), 2);
        assert!(out.contains('\n'), "expected pretty output");
    }

    #[tokio::test]
    async fn test_show_one_channel() {
        let out = show(&seeded_store(), Some(&ChannelId::new("C0")))
            .await
            .unwrap();
        let document: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(
            document,
            serde_json::json!([{
                "channelId": "C0",
                "sampleSize": 2,
                "excludedUsers": ["U1"],
                "pickedUsers": {}
            }])
        );
    }

    #[tokio::test]
    async fn test_show_unknown_channel_is_empty() {
        let out = show(&seeded_store(), Some(&ChannelId::new("C9")))
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }
}

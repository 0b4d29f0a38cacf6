//! Per-channel repository operations.

use pickem_core::{ChannelId, PickemRepository, SampleSize, StateStore, UserId};

use super::CliError;

/// Pick a user from `members` and record the pick.
///
/// # Errors
///
/// Returns `CliError::Store` if the state cannot be loaded or saved.
pub async fn pick<S: StateStore>(
    repository: &PickemRepository,
    store: &S,
    channel_id: &ChannelId,
    members: &[UserId],
) -> Result<String, CliError> {
    let picked = repository.pick(store, channel_id, members).await?;
    Ok(picked.map_or_else(
        || "No users to pick. Are they all excluded?".to_string(),
        |user_id| user_id.to_string(),
    ))
}

/// Exclude a user from future picks.
///
/// # Errors
///
/// Returns `CliError::Store` if the state cannot be loaded or saved.
pub async fn exclude<S: StateStore>(
    repository: &PickemRepository,
    store: &S,
    channel_id: &ChannelId,
    user_id: UserId,
) -> Result<String, CliError> {
    let message = format!("Excluded {user_id} in {channel_id}");
    repository.exclude(store, channel_id, user_id).await?;
    Ok(message)
}

/// Make an excluded user eligible again.
///
/// # Errors
///
/// Returns `CliError::Store` if the state cannot be loaded or saved.
pub async fn include<S: StateStore>(
    repository: &PickemRepository,
    store: &S,
    channel_id: &ChannelId,
    user_id: &UserId,
) -> Result<String, CliError> {
    repository.include(store, channel_id, user_id).await?;
    Ok(format!("Included {user_id} in {channel_id}"))
}

/// List excluded users, one per line.
///
/// # Errors
///
/// Returns `CliError::Store` if the state cannot be loaded.
pub async fn excluded<S: StateStore>(
    repository: &PickemRepository,
    store: &S,
    channel_id: &ChannelId,
) -> Result<String, CliError> {
    let excluded = repository.excluded(store, channel_id).await?;
    if excluded.is_empty() {
        return Ok("No excluded users".to_string());
    }
    Ok(excluded
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Show the sample size, or set it when `set` is given.
///
/// # Errors
///
/// Returns `CliError::Store` if the state cannot be loaded or saved.
pub async fn sample_size<S: StateStore>(
    repository: &PickemRepository,
    store: &S,
    channel_id: &ChannelId,
    set: Option<SampleSize>,
) -> Result<String, CliError> {
    match set {
        Some(sample_size) => {
            repository
                .set_sample_size(store, channel_id, sample_size)
                .await?;
            Ok(format!("Set sample_size to {sample_size} in {channel_id}"))
        }
        None => {
            let sample_size = repository.sample_size(store, channel_id).await?;
            Ok(sample_size.to_string())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pickem_core::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn repository() -> PickemRepository {
        PickemRepository::with_rng(StdRng::seed_from_u64(7))
    }

    #[tokio::test]
    async fn test_pick_prints_user() {
        let repo = repository();
        let store = MemoryStore::new();
        let channel = ChannelId::new("C0");

        let out = pick(&repo, &store, &channel, &[UserId::new("U1")])
            .await
            .unwrap();
        assert_eq!(out, "U1");
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_pick_with_everyone_excluded() {
        let repo = repository();
        let store = MemoryStore::new();
        let channel = ChannelId::new("C0");

        exclude(&repo, &store, &channel, UserId::new("U1"))
            .await
            .unwrap();
        let out = pick(&repo, &store, &channel, &[UserId::new("U1")])
            .await
            .unwrap();
        assert_eq!(out, "No users to pick. Are they all excluded?");
    }

    #[tokio::test]
    async fn test_excluded_lists_sorted_users() {
        let repo = repository();
        let store = MemoryStore::new();
        let channel = ChannelId::new("C0");

        assert_eq!(
            excluded(&repo, &store, &channel).await.unwrap(),
            "No excluded users"
        );

        exclude(&repo, &store, &channel, UserId::new("U2"))
            .await
            .unwrap();
        exclude(&repo, &store, &channel, UserId::new("U1"))
            .await
            .unwrap();
        assert_eq!(excluded(&repo, &store, &channel).await.unwrap(), "U1\nU2");

        include(&repo, &store, &channel, &UserId::new("U1"))
            .await
            .unwrap();
        assert_eq!(excluded(&repo, &store, &channel).await.unwrap(), "U2");
    }

    #[tokio::test]
    async fn test_sample_size_show_and_set() {
        let repo = repository();
        let store = MemoryStore::new();
        let channel = ChannelId::new("C0");

        assert_eq!(sample_size(&repo, &store, &channel, None).await.unwrap(), "1");

        let three: SampleSize = "3".parse().unwrap();
        sample_size(&repo, &store, &channel, Some(three))
            .await
            .unwrap();
        assert_eq!(sample_size(&repo, &store, &channel, None).await.unwrap(), "3");
    }
}

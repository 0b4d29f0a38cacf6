//! Repository operations over a [`StateStore`].
//!
//! Every operation loads the whole aggregate, works on one channel, and
//! (for mutations) saves the whole aggregate back. Mutations hold the
//! repository's cycle gate from load through save, so two mutations issued
//! through the same repository never overwrite each other's work. Writers in
//! other processes sharing the same blob are not coordinated.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use crate::select;
use crate::state::PickemState;
use crate::store::{StateStore, StoreError};
use crate::types::{ChannelId, SampleSize, UserId};

/// Fair per-channel user selection backed by a whole-blob store.
///
/// ## Examples
///
/// ```
/// use pickem_core::{ChannelId, MemoryStore, PickemRepository, UserId};
///
/// # tokio_test_block_on(async {
/// let repo = PickemRepository::new();
/// let store = MemoryStore::new();
/// let channel = ChannelId::new("C0");
///
/// repo.exclude(&store, &channel, UserId::new("U1")).await.unwrap();
/// let picked = repo
///     .pick(&store, &channel, &[UserId::new("U1"), UserId::new("U2")])
///     .await
///     .unwrap();
/// assert_eq!(picked, Some(UserId::new("U2")));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct PickemRepository<R = StdRng> {
    rng: Mutex<R>,
    gate: tokio::sync::Mutex<()>,
}

impl PickemRepository<StdRng> {
    /// A repository drawing from an OS-seeded generator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for PickemRepository<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + Send> PickemRepository<R> {
    /// A repository drawing from `rng`. Seed it for reproducible picks.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Pick the next user from `members` and record the pick.
    ///
    /// Returns `Ok(None)` without saving when every member is excluded or
    /// `members` is empty.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the state cannot be loaded or saved. A failed
    /// load never saves.
    #[instrument(skip_all, fields(channel_id = %channel_id, members = members.len()))]
    pub async fn pick<S: StateStore>(
        &self,
        store: &S,
        channel_id: &ChannelId,
        members: &[UserId],
    ) -> Result<Option<UserId>, StoreError> {
        let _cycle = self.gate.lock().await;
        let mut state = store.load().await?;
        let channel = state.channel_mut(channel_id);

        let selected = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            select::select_user(channel, members, &mut *rng)
        };
        let Some(selected) = selected else {
            debug!("No eligible members");
            return Ok(None);
        };

        let previous = channel.user(&selected).last_picked_at;
        channel.set_user_picked_at(selected.clone(), Utc::now());
        store.save(&state).await?;

        info!(user_id = %selected, previous = %previous, "Picked user");
        Ok(Some(selected))
    }

    /// Exclude `user_id` from future picks in the channel.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the state cannot be loaded or saved.
    #[instrument(skip_all, fields(channel_id = %channel_id, user_id = %user_id))]
    pub async fn exclude<S: StateStore>(
        &self,
        store: &S,
        channel_id: &ChannelId,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        self.mutate(store, |state| {
            state.channel_mut(channel_id).exclude_user(user_id);
        })
        .await?;
        info!("Excluded user");
        Ok(())
    }

    /// Make `user_id` eligible again in the channel.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the state cannot be loaded or saved.
    #[instrument(skip_all, fields(channel_id = %channel_id, user_id = %user_id))]
    pub async fn include<S: StateStore>(
        &self,
        store: &S,
        channel_id: &ChannelId,
        user_id: &UserId,
    ) -> Result<(), StoreError> {
        self.mutate(store, |state| {
            state.channel_mut(channel_id).include_user(user_id);
        })
        .await?;
        info!("Included user");
        Ok(())
    }

    /// The channel's excluded users, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the state cannot be loaded.
    #[instrument(skip_all, fields(channel_id = %channel_id))]
    pub async fn excluded<S: StateStore>(
        &self,
        store: &S,
        channel_id: &ChannelId,
    ) -> Result<Vec<UserId>, StoreError> {
        let state = store.load().await?;
        Ok(state
            .channel(channel_id)
            .map(|channel| channel.excluded_users().cloned().collect())
            .unwrap_or_default())
    }

    /// The channel's current sample size.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the state cannot be loaded.
    #[instrument(skip_all, fields(channel_id = %channel_id))]
    pub async fn sample_size<S: StateStore>(
        &self,
        store: &S,
        channel_id: &ChannelId,
    ) -> Result<SampleSize, StoreError> {
        let state = store.load().await?;
        Ok(state
            .channel(channel_id)
            .map(crate::state::ChannelState::sample_size)
            .unwrap_or_default())
    }

    /// Change the channel's sample size.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the state cannot be loaded or saved.
    #[instrument(skip_all, fields(channel_id = %channel_id, sample_size = %sample_size))]
    pub async fn set_sample_size<S: StateStore>(
        &self,
        store: &S,
        channel_id: &ChannelId,
        sample_size: SampleSize,
    ) -> Result<(), StoreError> {
        self.mutate(store, |state| {
            state.channel_mut(channel_id).set_sample_size(sample_size);
        })
        .await?;
        info!("Set sample size");
        Ok(())
    }

    /// One gated load, mutate, save cycle.
    async fn mutate<S, F>(&self, store: &S, apply: F) -> Result<(), StoreError>
    where
        S: StateStore,
        F: FnOnce(&mut PickemState) + Send,
    {
        let _cycle = self.gate.lock().await;
        let mut state = store.load().await?;
        apply(&mut state);
        store.save(&state).await
    }
}

//! Per-channel pick history and the aggregate that owns it.
//!
//! Everything here is pure in-memory bookkeeping. Loading and saving the
//! aggregate is the job of a [`StateStore`](crate::StateStore).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{ChannelId, SampleSize, UserId};

/// Implicit `last_picked_at` for a user with no recorded pick.
///
/// The earliest representable time, so users without history sort no later
/// than any stored pick, including pre-1970 ones read back from storage.
pub const NEVER_PICKED: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// The most recent pick of a user within one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedUserState {
    /// The picked user.
    pub user_id: UserId,
    /// When the user was last picked, or [`NEVER_PICKED`].
    pub last_picked_at: DateTime<Utc>,
}

impl PickedUserState {
    /// A synthetic entry for a user that has never been picked.
    #[must_use]
    pub const fn never_picked(user_id: UserId) -> Self {
        Self {
            user_id,
            last_picked_at: NEVER_PICKED,
        }
    }

    /// Whether this entry carries a real pick time.
    #[must_use]
    pub fn has_been_picked(&self) -> bool {
        self.last_picked_at > NEVER_PICKED
    }
}

/// Exclusions, sample size and pick history for a single channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    channel_id: ChannelId,
    sample_size: SampleSize,
    excluded_users: BTreeSet<UserId>,
    picked_users: BTreeMap<UserId, PickedUserState>,
}

impl ChannelState {
    /// An empty channel with the default sample size.
    #[must_use]
    pub const fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            sample_size: SampleSize::ONE,
            excluded_users: BTreeSet::new(),
            picked_users: BTreeMap::new(),
        }
    }

    /// The channel this state belongs to.
    #[must_use]
    pub const fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Exclude a user from future picks. Idempotent.
    pub fn exclude_user(&mut self, user_id: UserId) {
        self.excluded_users.insert(user_id);
    }

    /// Make an excluded user eligible again. Idempotent; no-op if absent.
    pub fn include_user(&mut self, user_id: &UserId) {
        self.excluded_users.remove(user_id);
    }

    /// Whether the user is currently excluded.
    #[must_use]
    pub fn is_excluded(&self, user_id: &UserId) -> bool {
        self.excluded_users.contains(user_id)
    }

    /// Excluded users in ascending id order.
    pub fn excluded_users(&self) -> impl Iterator<Item = &UserId> {
        self.excluded_users.iter()
    }

    /// The stored history entry, or a never-picked entry. Never mutates.
    #[must_use]
    pub fn user(&self, user_id: &UserId) -> PickedUserState {
        self.picked_users
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| PickedUserState::never_picked(user_id.clone()))
    }

    /// Recorded pick history in ascending id order.
    pub fn picked_users(&self) -> impl Iterator<Item = &PickedUserState> {
        self.picked_users.values()
    }

    /// Record a pick of `user_id` now.
    pub fn set_user_picked(&mut self, user_id: UserId) {
        self.set_user_picked_at(user_id, Utc::now());
    }

    /// Record a pick of `user_id` at `at`.
    ///
    /// Pick times never move backwards: if `at` is not later than the stored
    /// time, the stored time advances by one nanosecond instead.
    pub fn set_user_picked_at(&mut self, user_id: UserId, at: DateTime<Utc>) {
        let entry = self
            .picked_users
            .entry(user_id)
            .or_insert_with_key(|id| PickedUserState::never_picked(id.clone()));

        entry.last_picked_at = if at > entry.last_picked_at {
            at
        } else {
            entry.last_picked_at + TimeDelta::nanoseconds(1)
        };
    }

    /// Insert a history entry as-is, bypassing the forward-only rule.
    ///
    /// Used when rebuilding state from storage.
    pub fn restore_pick(&mut self, picked: PickedUserState) {
        self.picked_users.insert(picked.user_id.clone(), picked);
    }

    /// Current cohort width.
    #[must_use]
    pub const fn sample_size(&self) -> SampleSize {
        self.sample_size
    }

    /// Change the cohort width.
    pub const fn set_sample_size(&mut self, sample_size: SampleSize) {
        self.sample_size = sample_size;
    }
}

/// Every channel's state, keyed by channel id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickemState {
    channels: BTreeMap<ChannelId, ChannelState>,
}

impl PickemState {
    /// An empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel's state, created on first reference.
    pub fn channel_mut(&mut self, channel_id: &ChannelId) -> &mut ChannelState {
        self.channels
            .entry(channel_id.clone())
            .or_insert_with_key(|id| ChannelState::new(id.clone()))
    }

    /// The channel's state if it has ever been referenced.
    #[must_use]
    pub fn channel(&self, channel_id: &ChannelId) -> Option<&ChannelState> {
        self.channels.get(channel_id)
    }

    /// Replace (or add) a channel's state wholesale.
    pub fn set_channel(&mut self, channel: ChannelState) {
        self.channels.insert(channel.channel_id.clone(), channel);
    }

    /// All channels in ascending id order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelState> {
        self.channels.values()
    }

    /// Number of channels with state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel has state yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn channel() -> ChannelState {
        ChannelState::new(ChannelId::new("c0"))
    }

    #[test]
    fn test_exclude_and_include_are_idempotent() {
        let mut ch = channel();
        let u1 = UserId::new("u1");

        ch.exclude_user(u1.clone());
        ch.exclude_user(u1.clone());
        assert_eq!(ch.excluded_users().collect::<Vec<_>>(), vec![&u1]);

        ch.include_user(&u1);
        ch.include_user(&u1);
        assert!(ch.excluded_users().next().is_none());
        assert!(!ch.is_excluded(&u1));
    }

    #[test]
    fn test_include_unknown_user_is_noop() {
        let mut ch = channel();
        ch.include_user(&UserId::new("nobody"));
        assert!(ch.excluded_users().next().is_none());
    }

    #[test]
    fn test_user_without_history_is_never_picked() {
        let ch = channel();
        let state = ch.user(&UserId::new("u1"));
        assert_eq!(state.user_id, UserId::new("u1"));
        assert_eq!(state.last_picked_at, NEVER_PICKED);
        assert!(!state.has_been_picked());
        // Lookup must not create an entry.
        assert_eq!(ch.picked_users().count(), 0);
    }

    #[test]
    fn test_set_user_picked_records_time() {
        let mut ch = channel();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        ch.set_user_picked_at(UserId::new("u1"), at);
        assert_eq!(ch.user(&UserId::new("u1")).last_picked_at, at);
    }

    #[test]
    fn test_set_user_picked_never_moves_backwards() {
        let mut ch = channel();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let user = UserId::new("u1");

        ch.set_user_picked_at(user.clone(), later);
        ch.set_user_picked_at(user.clone(), earlier);
        assert!(ch.user(&user).last_picked_at > later);

        let before = ch.user(&user).last_picked_at;
        ch.set_user_picked_at(user.clone(), before);
        assert!(ch.user(&user).last_picked_at > before);
    }

    #[test]
    fn test_pick_at_epoch_counts_as_picked() {
        let mut ch = channel();
        let user = UserId::new("u1");
        ch.restore_pick(PickedUserState {
            user_id: user.clone(),
            last_picked_at: DateTime::<Utc>::UNIX_EPOCH,
        });
        assert!(ch.user(&user).has_been_picked());
        assert!(NEVER_PICKED < ch.user(&user).last_picked_at);
    }

    #[test]
    fn test_set_user_picked_uses_wall_clock() {
        let mut ch = channel();
        ch.set_user_picked(UserId::new("u1"));
        assert!(ch.user(&UserId::new("u1")).has_been_picked());
    }

    #[test]
    fn test_exclusion_keeps_history() {
        let mut ch = channel();
        let user = UserId::new("u1");
        ch.set_user_picked(user.clone());
        ch.exclude_user(user.clone());
        assert!(ch.is_excluded(&user));
        assert!(ch.user(&user).has_been_picked());
    }

    #[test]
    fn test_channel_mut_creates_lazily() {
        let mut state = PickemState::new();
        let id = ChannelId::new("c1");
        assert!(state.channel(&id).is_none());

        state.channel_mut(&id).exclude_user(UserId::new("u1"));
        assert_eq!(state.len(), 1);
        assert!(state.channel(&id).unwrap().is_excluded(&UserId::new("u1")));

        // Second reference returns the same entry.
        state.channel_mut(&id);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_default_sample_size_is_one() {
        assert_eq!(channel().sample_size(), SampleSize::ONE);
    }
}

//! The fairness algorithm.
//!
//! Candidates are the channel members that are not excluded. They are ranked
//! oldest pick first (never-picked users before everyone else, ties broken by
//! user id), the first `sample_size` of them form the cohort, and one cohort
//! member is drawn uniformly at random.

use std::collections::HashSet;

use rand::Rng;

use crate::state::{ChannelState, PickedUserState};
use crate::types::UserId;

/// Rank the eligible members of `channel`, most overdue first.
///
/// Excluded members are dropped and duplicates collapse to their first
/// occurrence.
#[must_use]
pub fn rank_candidates(channel: &ChannelState, members: &[UserId]) -> Vec<PickedUserState> {
    let mut seen = HashSet::with_capacity(members.len());
    let mut candidates: Vec<PickedUserState> = members
        .iter()
        .filter(|user_id| !channel.is_excluded(user_id))
        .filter(|user_id| seen.insert(*user_id))
        .map(|user_id| channel.user(user_id))
        .collect();

    candidates.sort_by(|a, b| {
        a.last_picked_at
            .cmp(&b.last_picked_at)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    candidates
}

/// The most overdue candidates, at most `sample_size` of them.
#[must_use]
pub fn cohort(channel: &ChannelState, members: &[UserId]) -> Vec<PickedUserState> {
    let mut ranked = rank_candidates(channel, members);
    ranked.truncate(channel.sample_size().as_usize());
    ranked
}

/// Choose a user from `members` without recording the pick.
///
/// Returns `None` when every member is excluded (or `members` is empty).
pub fn select_user<R: Rng + ?Sized>(
    channel: &ChannelState,
    members: &[UserId],
    rng: &mut R,
) -> Option<UserId> {
    let cohort = cohort(channel, members);
    if cohort.is_empty() {
        return None;
    }
    let index = rng.random_range(0..cohort.len());
    cohort.into_iter().nth(index).map(|picked| picked.user_id)
}

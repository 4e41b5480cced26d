//! Folding peer snapshots into one bounded "others" table per local identity.
//!
//! This is a heuristic merge, not consensus: two peers that received different
//! snapshots keep different views of a third player indefinitely.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::record::{PlayerId, PlayerRatingData};

/// Leaderboard order: rating desc, games played desc, handle asc.
#[must_use]
pub fn leaderboard_order(a: &PlayerRatingData, b: &PlayerRatingData) -> Ordering {
    b.rating
        .total_cmp(&a.rating)
        .then_with(|| b.games_played.cmp(&a.games_played))
        .then_with(|| a.handle.cmp(&b.handle))
}

fn merge_counting(
    local: &PlayerId,
    local_others: Vec<PlayerRatingData>,
    incoming: &[PlayerRatingData],
    capacity: usize,
    replace_on_tie: bool,
) -> (Vec<PlayerRatingData>, usize) {
    let mut by_handle: HashMap<PlayerId, PlayerRatingData> = local_others
        .into_iter()
        .filter(|record| &record.handle != local)
        .map(|record| (record.handle.clone(), record))
        .collect();

    let mut accepted = 0;
    for record in incoming {
        if &record.handle == local {
            continue;
        }
        let mut candidate = record.clone();
        candidate.commit_pending();
        candidate.is_synced = true;
        match by_handle.entry(candidate.handle.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
                accepted += 1;
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get().last_updated;
                if candidate.last_updated > current
                    || (replace_on_tie && candidate.last_updated == current)
                {
                    slot.insert(candidate);
                    accepted += 1;
                }
            }
        }
    }

    let mut merged: Vec<PlayerRatingData> = by_handle.into_values().collect();
    merged.sort_by(leaderboard_order);
    merged.truncate(capacity);
    (merged, accepted)
}

/// Merge `incoming` into `local_others`, newest `last_updated` winning per handle.
///
/// Records for `local` are never merged. The result is sorted in leaderboard order
/// and cut to `capacity`; whatever falls off the end is evicted.
#[must_use]
pub fn merge(
    local: &PlayerId,
    local_others: Vec<PlayerRatingData>,
    incoming: &[PlayerRatingData],
    capacity: usize,
) -> Vec<PlayerRatingData> {
    merge_counting(local, local_others, incoming, capacity, false).0
}

/// The retained "others" table of one local identity.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerTable {
    entries: Vec<PlayerRatingData>,
    capacity: usize,
}

impl PeerTable {
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Fold records in, returning how many were inserted or replaced.
    pub fn merge(&mut self, local: &PlayerId, incoming: &[PlayerRatingData]) -> usize {
        let current = std::mem::take(&mut self.entries);
        let (merged, accepted) = merge_counting(local, current, incoming, self.capacity, false);
        self.entries = merged;
        accepted
    }

    /// Fold in records this process just finalized. They are authoritative, so a
    /// timestamp tie goes to the new record.
    pub fn absorb_finalized(&mut self, local: &PlayerId, finalized: &[PlayerRatingData]) {
        let current = std::mem::take(&mut self.entries);
        self.entries = merge_counting(local, current, finalized, self.capacity, true).0;
    }

    #[must_use]
    pub fn get(&self, player: &PlayerId) -> Option<&PlayerRatingData> {
        self.entries.iter().find(|record| &record.handle == player)
    }

    #[must_use]
    pub fn entries(&self) -> &[PlayerRatingData] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

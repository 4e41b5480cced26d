//! Orchestrator consumed by the host application.
//!
//! The host constructs one `RatingEngine` at its composition root and hands it by
//! reference to whatever needs ratings. Match events flow in (`begin_match`,
//! `checkpoint`, `finalize`); ratings, deltas, tiers, and leaderboard rows flow out.

use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use crate::clock::{Clock, SystemClock};
use crate::codec::CodecError;
use crate::config::{RatingConfig, RatingConfigError};
use crate::constants::LOG_TARGET_ENGINE;
use crate::identity::LocalIdentity;
use crate::record::{
    CombatTotals, MatchEntry, PlayerId, PlayerRatingData, RatingSubject, UnitCategoryId,
};
use crate::storage::RatingStorage;
use crate::store::{CheckpointOutcome, FinalizeOutcome, RatingNotice, RatingStore};
use crate::tier::RankTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchPhase {
    Idle,
    InProgress,
    Finalized,
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    /// 1-based position.
    pub position: usize,
    pub handle: String,
    pub rating: f64,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub tier: RankTier,
}

pub struct RatingEngine<S, C = SystemClock> {
    store: RatingStore<S, C>,
    phase: MatchPhase,
    last_deltas: HashMap<PlayerId, i32>,
}

impl<S> RatingEngine<S, SystemClock>
where
    S: RatingStorage,
{
    /// Create an engine on the wall clock.
    ///
    /// # Errors
    ///
    /// Returns `RatingConfigError` if the configuration is invalid.
    pub fn new(
        config: RatingConfig,
        storage: S,
        local: Option<LocalIdentity>,
    ) -> Result<Self, RatingConfigError> {
        Self::with_clock(config, storage, SystemClock, local)
    }
}

impl<S, C> RatingEngine<S, C>
where
    S: RatingStorage,
    C: Clock,
{
    /// Create an engine with an explicit time source.
    ///
    /// # Errors
    ///
    /// Returns `RatingConfigError` if the configuration is invalid.
    pub fn with_clock(
        config: RatingConfig,
        storage: S,
        clock: C,
        local: Option<LocalIdentity>,
    ) -> Result<Self, RatingConfigError> {
        config.validate()?;
        Ok(Self {
            store: RatingStore::new(config, storage, clock, local),
            phase: MatchPhase::Idle,
            last_deltas: HashMap::new(),
        })
    }

    #[must_use]
    pub const fn store(&self) -> &RatingStore<S, C> {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &RatingConfig {
        self.store.config()
    }

    #[must_use]
    pub const fn local(&self) -> Option<&LocalIdentity> {
        self.store.local()
    }

    /// Open a new match; clears the previous match's deltas and any journal it left behind.
    pub fn begin_match(&mut self) {
        self.phase = MatchPhase::InProgress;
        self.last_deltas.clear();
        self.store.discard_pending();
    }

    /// Journal the standings at a safe point such as a turn boundary.
    pub fn checkpoint(&mut self, entries: &[MatchEntry], current_turn: u32) -> CheckpointOutcome {
        match self.phase {
            MatchPhase::Finalized => return CheckpointOutcome::MatchClosed,
            MatchPhase::Idle => self.begin_match(),
            MatchPhase::InProgress => {}
        }
        self.store.checkpoint(entries, current_turn)
    }

    /// Commit the confirmed result. Only the first call per match has any effect.
    pub fn finalize(&mut self, entries: &[MatchEntry]) -> FinalizeOutcome {
        if self.phase == MatchPhase::Finalized {
            debug!(target: LOG_TARGET_ENGINE, "finalize ignored: match already finalized");
            return FinalizeOutcome::AlreadyFinalized;
        }
        self.phase = MatchPhase::Finalized;
        self.last_deltas.clear();
        let outcome = self.store.finalize(entries);
        if let FinalizeOutcome::Committed(seats) = &outcome {
            self.last_deltas
                .extend(seats.iter().map(|seat| (seat.player.clone(), seat.applied_delta)));
        }
        outcome
    }

    pub fn get_rating(&mut self, player: &PlayerId) -> f64 {
        self.store.get_rating(player)
    }

    pub fn player_record(&mut self, player: &PlayerId) -> &PlayerRatingData {
        self.store.player_record(player)
    }

    /// Change applied to `player` by the most recent finalized match, after floor protection.
    #[must_use]
    pub fn rating_delta(&self, player: &PlayerId) -> Option<i32> {
        self.last_deltas.get(player).copied()
    }

    #[must_use]
    pub fn rank_tier(&self, rating: f64) -> RankTier {
        RankTier::from_rating(rating, &self.config().rank_tiers)
    }

    pub fn player_tier(&mut self, player: &PlayerId) -> RankTier {
        let record = self.store.player_record(player).clone();
        RankTier::for_record(&record, &self.config().rank_tiers)
    }

    /// Best `limit` synced, visible players.
    pub fn top_players(&mut self, limit: usize) -> Vec<LeaderboardRow> {
        let records = self.store.top_players(limit);
        let thresholds = &self.store.config().rank_tiers;
        records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| LeaderboardRow {
                position: idx + 1,
                tier: RankTier::for_record(&record, thresholds),
                handle: record.handle.as_str().to_string(),
                rating: record.rating,
                games_played: record.games_played,
                wins: record.wins,
                losses: record.losses,
            })
            .collect()
    }

    /// Verify and fold in a snapshot delivered by the peer transport.
    ///
    /// # Errors
    ///
    /// Returns the `CodecError` when the payload fails verification.
    pub fn ingest_peer_snapshot(&mut self, bytes: &[u8]) -> Result<usize, CodecError> {
        self.store.ingest_peer_snapshot(bytes)
    }

    /// Sealed snapshot for the peer transport; `None` without a local identity.
    pub fn export_peer_snapshot(&mut self) -> Option<Vec<u8>> {
        self.store.export_peer_snapshot()
    }

    /// Returns false when there is no local identity to update.
    pub fn set_show_rating(&mut self, show: bool) -> bool {
        self.store.set_show_rating(show)
    }

    pub fn record_category_combat(&mut self, category: &UnitCategoryId, totals: CombatTotals) {
        self.store.record_category_combat(category, totals);
    }

    pub fn combat_totals(&mut self, subject: &RatingSubject) -> CombatTotals {
        self.store.combat_totals(subject)
    }

    /// Take every queued notice; callers surface the player-facing ones.
    pub fn drain_notices(&mut self) -> Vec<RatingNotice> {
        self.store.drain_notices()
    }
}

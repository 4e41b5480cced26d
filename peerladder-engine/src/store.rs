//! Process-lifetime table of rating records and the crash-recovery journal.
//!
//! Every peer runs the same store logic over the same match inputs, so the in-memory
//! records agree across machines. Storage is touched only for the local identity's
//! own two files.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;

use crate::clock::Clock;
use crate::codec::{CodecError, PeerSnapshotFile, RatingFile};
use crate::config::RatingConfig;
use crate::constants::{LOG_TARGET_STORE, LOG_TARGET_SYNC};
use crate::formula::PlacementCurve;
use crate::identity::{LocalIdentity, StorageSlot};
use crate::numbers::{floor_f64_to_i32, usize_to_i64};
use crate::record::{
    CombatTotals, MatchEntry, PendingGameSnapshot, PlayerId, PlayerRatingData, RatingSubject,
    UnitCategoryId,
};
use crate::storage::RatingStorage;
use crate::sync::{PeerTable, leaderboard_order};

/// Something the host may need to tell the player or its own logs about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingNotice {
    /// A stored file failed verification and was replaced by defaults.
    CorruptFile { file: String, reason: String },
    /// A write was rejected; the in-memory record stays authoritative.
    WriteFailed { file: String, reason: String },
    /// Too few eligible players; no rating changed.
    MatchSkipped { eligible: usize, required: usize },
}

impl RatingNotice {
    /// Only corrupted files and skipped matches are shown to players.
    #[must_use]
    pub const fn is_player_facing(&self) -> bool {
        matches!(self, Self::CorruptFile { .. } | Self::MatchSkipped { .. })
    }
}

impl fmt::Display for RatingNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorruptFile { .. } => {
                write!(f, "Your rating data was corrupted and has been reset.")
            }
            Self::WriteFailed { file, reason } => {
                write!(f, "Could not save rating data to {file}: {reason}")
            }
            Self::MatchSkipped { eligible, required } => write!(
                f,
                "Rating not calculated: {eligible} eligible players, {required} required."
            ),
        }
    }
}

/// One seat's rating result for a match.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatResult {
    pub player: PlayerId,
    /// 0-based rank among eligible seats.
    pub rank: usize,
    pub old_rating: f64,
    /// Formula output before floor protection.
    pub delta: i32,
    /// Change actually applied, `new_rating - old_rating`.
    pub applied_delta: i32,
    pub new_rating: f64,
    pub stats: CombatTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointOutcome {
    Staged { seats: usize },
    /// A newer checkpoint is already journaled.
    Stale { stored_turn: u32 },
    Skipped { eligible: usize, required: usize },
    /// The match was already finalized.
    MatchClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Committed(Vec<SeatResult>),
    Skipped { eligible: usize, required: usize },
    AlreadyFinalized,
}

struct Ineligible {
    eligible: usize,
    required: usize,
}

pub struct RatingStore<S, C> {
    config: RatingConfig,
    storage: S,
    clock: C,
    local: Option<LocalIdentity>,
    players: HashMap<PlayerId, PlayerRatingData>,
    categories: HashMap<UnitCategoryId, CombatTotals>,
    peers: PeerTable,
    peers_loaded: bool,
    notices: Vec<RatingNotice>,
}

impl<S, C> RatingStore<S, C>
where
    S: RatingStorage,
    C: Clock,
{
    #[must_use]
    pub fn new(config: RatingConfig, storage: S, clock: C, local: Option<LocalIdentity>) -> Self {
        let peers = PeerTable::new(config.peer_retention);
        Self {
            config,
            storage,
            clock,
            local,
            players: HashMap::new(),
            categories: HashMap::new(),
            peers,
            peers_loaded: false,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RatingConfig {
        &self.config
    }

    #[must_use]
    pub const fn local(&self) -> Option<&LocalIdentity> {
        self.local.as_ref()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub fn drain_notices(&mut self) -> Vec<RatingNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Current rating, loading the record on first access.
    pub fn get_rating(&mut self, player: &PlayerId) -> f64 {
        self.record_mut(player).rating
    }

    pub fn player_record(&mut self, player: &PlayerId) -> &PlayerRatingData {
        self.record_mut(player)
    }

    /// The retained others table, loading it from storage on first access.
    pub fn peers(&mut self) -> &PeerTable {
        self.ensure_peers_loaded();
        &self.peers
    }

    fn record_mut(&mut self, player: &PlayerId) -> &mut PlayerRatingData {
        if !self.players.contains_key(player) {
            let record = self.load_record(player);
            self.players.insert(player.clone(), record);
        }
        let starting = self.config.starting_rating;
        self.players
            .entry(player.clone())
            .or_insert_with(|| PlayerRatingData::placeholder(player.clone(), starting))
    }

    fn load_record(&mut self, player: &PlayerId) -> PlayerRatingData {
        if let Some(local) = self.local.clone().filter(|local| local.is(player)) {
            if let Some(record) = self.load_local_record(&local) {
                return record;
            }
        } else {
            self.ensure_peers_loaded();
            if let Some(record) = self.peers.get(player) {
                debug!(target: LOG_TARGET_STORE, "{player} resolved from peer table");
                return record.clone();
            }
        }
        debug!(target: LOG_TARGET_STORE, "{player} has no record; using placeholder");
        PlayerRatingData::placeholder(player.clone(), self.config.starting_rating)
    }

    fn read_slot(&mut self, slot: &StorageSlot) -> Option<Vec<u8>> {
        match self.storage.read(slot) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(target: LOG_TARGET_STORE, "reading {slot} failed: {err}");
                None
            }
        }
    }

    fn reject_file(&mut self, slot: &StorageSlot, err: &CodecError) {
        if err.is_corruption() {
            warn!(target: LOG_TARGET_STORE, "discarding corrupt {slot}: {err}");
            self.notices.push(RatingNotice::CorruptFile {
                file: slot.file_name(),
                reason: err.to_string(),
            });
        } else {
            info!(target: LOG_TARGET_STORE, "ignoring {slot}: {err}");
        }
    }

    fn load_local_record(&mut self, local: &LocalIdentity) -> Option<PlayerRatingData> {
        let slot = local.rating_slot();
        let bytes = self.read_slot(&slot)?;
        let file = match RatingFile::decode(&bytes, &self.config.season_id) {
            Ok(file) => file,
            Err(err) => {
                self.reject_file(&slot, &err);
                return None;
            }
        };
        if !local.is(&file.player.handle) {
            self.notices.push(RatingNotice::CorruptFile {
                file: slot.file_name(),
                reason: "record belongs to another handle".to_string(),
            });
            warn!(target: LOG_TARGET_STORE, "{slot} holds a record for another handle");
            return None;
        }

        let mut record = file.player;
        let pending_turn = record.pending_game.as_ref().map(|p| p.turn);
        if record.commit_pending() {
            info!(
                target: LOG_TARGET_STORE,
                "recovered unfinished match for {} from turn {}",
                record.handle,
                pending_turn.unwrap_or_default()
            );
            self.write_record(local, &record);
        }
        Some(record)
    }

    fn ensure_peers_loaded(&mut self) {
        if self.peers_loaded {
            return;
        }
        self.peers_loaded = true;
        let Some(local) = self.local.clone() else {
            return;
        };
        let slot = local.peer_slot();
        let Some(bytes) = self.read_slot(&slot) else {
            return;
        };
        match PeerSnapshotFile::decode(&bytes, &self.config.season_id) {
            Ok(file) => {
                let accepted = self.peers.merge(local.player(), &file.players);
                debug!(target: LOG_TARGET_SYNC, "loaded {accepted} peer records from {slot}");
            }
            Err(err) => self.reject_file(&slot, &err),
        }
    }

    fn write_record(&mut self, local: &LocalIdentity, record: &PlayerRatingData) {
        let slot = local.rating_slot();
        let mut file = RatingFile::new(&self.config.season_id, record.clone());
        let result = file.encode().map(|bytes| self.storage.write(&slot, &bytes));
        self.report_write(&slot, result);
    }

    fn report_write<E: fmt::Display>(
        &mut self,
        slot: &StorageSlot,
        result: Result<Result<(), E>, CodecError>,
    ) {
        let reason = match result {
            Ok(Ok(())) => {
                debug!(target: LOG_TARGET_STORE, "wrote {slot}");
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(err) => err.to_string(),
        };
        warn!(target: LOG_TARGET_STORE, "write to {slot} failed: {reason}");
        self.notices.push(RatingNotice::WriteFailed {
            file: slot.file_name(),
            reason,
        });
    }

    fn persist_local(&mut self) {
        let Some(local) = self.local.clone() else {
            return;
        };
        if let Some(record) = self.players.get(local.player()).cloned() {
            self.write_record(&local, &record);
        }
    }

    fn persist_peers(&mut self) {
        let Some(local) = self.local.clone() else {
            return;
        };
        let slot = local.peer_slot();
        let mut file = PeerSnapshotFile::new(&self.config.season_id, self.peers.entries().to_vec());
        let result = file.encode().map(|bytes| self.storage.write(&slot, &bytes));
        self.report_write(&slot, result);
    }

    fn involves_local(&self, seats: &[SeatResult]) -> bool {
        self.local
            .as_ref()
            .is_some_and(|local| seats.iter().any(|seat| local.is(&seat.player)))
    }

    /// Score the eligible seats of `entries` as if the match ended now.
    fn project(&mut self, entries: &[MatchEntry]) -> Result<Vec<SeatResult>, Ineligible> {
        let include_computers = self.config.include_computer_players;
        let mut eligible: Vec<&MatchEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.eligibility.is_eligible(include_computers)
                && !eligible.iter().any(|seen| seen.player == entry.player)
            {
                eligible.push(entry);
            }
        }
        let required = self.config.min_eligible_players;
        if eligible.len() < required {
            return Err(Ineligible {
                eligible: eligible.len(),
                required,
            });
        }
        eligible.sort_by_key(|entry| entry.placement);

        let ratings: Vec<f64> = eligible
            .iter()
            .map(|entry| self.get_rating(&entry.player))
            .collect();
        let curve = PlacementCurve::new(eligible.len(), &self.config);
        let seats = eligible
            .iter()
            .enumerate()
            .map(|(rank, entry)| {
                let old_rating = ratings.get(rank).copied().unwrap_or(self.config.starting_rating);
                let opponents: Vec<f64> = ratings
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| *idx != rank)
                    .map(|(_, rating)| *rating)
                    .collect();
                let delta = curve.rating_change(rank, old_rating, &opponents, &self.config);
                let new_rating = (old_rating + f64::from(delta)).max(self.config.minimum_rating);
                SeatResult {
                    player: entry.player.clone(),
                    rank,
                    old_rating,
                    delta,
                    applied_delta: floor_f64_to_i32((new_rating - old_rating).round()),
                    new_rating,
                    stats: entry.stats,
                }
            })
            .collect();
        Ok(seats)
    }

    /// Journal the speculative result of the match so far.
    ///
    /// The snapshot is always derived from the committed fields, so repeating a
    /// checkpoint with the same inputs rewrites an identical snapshot.
    pub fn checkpoint(&mut self, entries: &[MatchEntry], current_turn: u32) -> CheckpointOutcome {
        let seats = match self.project(entries) {
            Ok(seats) => seats,
            Err(Ineligible { eligible, required }) => {
                debug!(target: LOG_TARGET_STORE, "checkpoint skipped: {eligible}/{required} eligible");
                return CheckpointOutcome::Skipped { eligible, required };
            }
        };

        let stored_turn = seats
            .iter()
            .filter_map(|seat| self.players.get(&seat.player))
            .filter_map(|record| record.pending_game.as_ref().map(|p| p.turn))
            .max();
        if let Some(stored_turn) = stored_turn.filter(|turn| *turn > current_turn) {
            debug!(target: LOG_TARGET_STORE, "checkpoint for turn {current_turn} is older than {stored_turn}");
            return CheckpointOutcome::Stale { stored_turn };
        }

        let now = self.clock.now();
        for seat in &seats {
            let record = self.record_mut(&seat.player);
            let won = seat.rank == 0;
            record.pending_game = Some(PendingGameSnapshot {
                rating: seat.new_rating,
                wins: record.wins + u32::from(won),
                losses: record.losses + u32::from(!won),
                games_played: record.games_played + 1,
                total_kill_value: record.total_kill_value.saturating_add(seat.stats.kill_value),
                total_death_value: record.total_death_value.saturating_add(seat.stats.death_value),
                total_placement: record.total_placement.saturating_add(usize_to_i64(seat.rank)),
                turn: current_turn,
                timestamp: now,
            });
        }
        if self.involves_local(&seats) {
            self.persist_local();
        }
        CheckpointOutcome::Staged { seats: seats.len() }
    }

    /// Apply the confirmed match result exactly as computed from the committed fields.
    pub fn finalize(&mut self, entries: &[MatchEntry]) -> FinalizeOutcome {
        let seats = match self.project(entries) {
            Ok(seats) => seats,
            Err(Ineligible { eligible, required }) => {
                warn!(target: LOG_TARGET_STORE, "match skipped: {eligible} eligible players, {required} required");
                self.notices
                    .push(RatingNotice::MatchSkipped { eligible, required });
                self.discard_pending();
                return FinalizeOutcome::Skipped { eligible, required };
            }
        };

        let now = self.clock.now();
        let mut finalized = Vec::with_capacity(seats.len());
        for seat in &seats {
            let record = self.record_mut(&seat.player);
            let won = seat.rank == 0;
            record.rating = seat.new_rating;
            record.games_played += 1;
            record.wins += u32::from(won);
            record.losses += u32::from(!won);
            record.total_kill_value = record.total_kill_value.saturating_add(seat.stats.kill_value);
            record.total_death_value = record.total_death_value.saturating_add(seat.stats.death_value);
            record.total_placement = record.total_placement.saturating_add(usize_to_i64(seat.rank));
            record.last_updated = now;
            record.pending_game = None;
            record.is_synced = true;
            finalized.push(record.clone());
            info!(
                target: LOG_TARGET_STORE,
                "{} rank {} {:+} -> {:.0}",
                seat.player,
                seat.rank,
                seat.applied_delta,
                seat.new_rating
            );
        }

        let local_stray = self.clear_pending();
        if local_stray || self.involves_local(&seats) {
            self.persist_local();
        }
        if let Some(local) = self.local.clone() {
            self.ensure_peers_loaded();
            self.peers.absorb_finalized(local.player(), &finalized);
            self.persist_peers();
        }
        FinalizeOutcome::Committed(seats)
    }

    /// Drop every journaled snapshot still held in memory, rewriting the local
    /// file if its journal was among them.
    pub fn discard_pending(&mut self) {
        if self.clear_pending() {
            self.persist_local();
        }
    }

    /// Returns true when the local record lost a pending game.
    fn clear_pending(&mut self) -> bool {
        let local = self.local.as_ref().map(LocalIdentity::player);
        let mut local_cleared = false;
        for record in self.players.values_mut() {
            if record.pending_game.take().is_some() {
                debug!(target: LOG_TARGET_STORE, "discarding journaled game for {}", record.handle);
                local_cleared |= local == Some(&record.handle);
            }
        }
        local_cleared
    }

    /// Verify a peer snapshot and fold it into the others table and in-memory records.
    ///
    /// # Errors
    ///
    /// Returns the `CodecError` when the payload fails verification; nothing is merged.
    pub fn ingest_peer_snapshot(&mut self, bytes: &[u8]) -> Result<usize, CodecError> {
        let file = PeerSnapshotFile::decode(bytes, &self.config.season_id)?;
        let local = self.local.clone();
        let mut accepted = 0;
        if let Some(local) = &local {
            self.ensure_peers_loaded();
            accepted = self.peers.merge(local.player(), &file.players);
            self.persist_peers();
        }

        for incoming in &file.players {
            if local.as_ref().is_some_and(|local| local.is(&incoming.handle)) {
                continue;
            }
            let mut incoming = incoming.clone();
            incoming.commit_pending();
            match self.players.get_mut(&incoming.handle) {
                Some(existing) => {
                    let newer = incoming.last_updated > existing.last_updated
                        && existing.pending_game.is_none();
                    if !existing.is_synced || newer {
                        *existing = incoming;
                    }
                }
                None if local.is_none() => {
                    self.players.insert(incoming.handle.clone(), incoming);
                    accepted += 1;
                }
                None => {}
            }
        }
        debug!(target: LOG_TARGET_SYNC, "peer snapshot accepted {accepted} records");
        Ok(accepted)
    }

    /// Seal the local record plus the retained others for the transport collaborator.
    pub fn export_peer_snapshot(&mut self) -> Option<Vec<u8>> {
        let local = self.local.clone()?;
        let mut own = self.record_mut(local.player()).clone();
        self.ensure_peers_loaded();
        let mut players = Vec::with_capacity(self.peers.len() + 1);
        if own.is_synced {
            own.pending_game = None;
            players.push(own);
        }
        let room = self.config.peer_retention.saturating_sub(players.len());
        players.extend(self.peers.entries().iter().take(room).cloned());
        let mut file = PeerSnapshotFile::new(&self.config.season_id, players);
        match file.encode() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(target: LOG_TARGET_SYNC, "could not encode peer snapshot: {err}");
                None
            }
        }
    }

    /// Change the local player's display opt-out and persist it right away.
    pub fn set_show_rating(&mut self, show: bool) -> bool {
        let Some(local) = self.local.clone() else {
            return false;
        };
        self.record_mut(local.player()).show_rating = show;
        self.persist_local();
        true
    }

    /// Synced, visible records from memory and the others table, best first.
    pub fn top_players(&mut self, limit: usize) -> Vec<PlayerRatingData> {
        self.ensure_peers_loaded();
        let mut by_handle: HashMap<&PlayerId, &PlayerRatingData> = HashMap::new();
        for record in self.peers.entries().iter().chain(self.players.values()) {
            if !record.is_synced {
                continue;
            }
            let newer = by_handle
                .get(&record.handle)
                .is_none_or(|seen| record.last_updated >= seen.last_updated);
            if newer {
                by_handle.insert(&record.handle, record);
            }
        }
        let mut rows: Vec<PlayerRatingData> = by_handle
            .into_values()
            .filter(|record| record.show_rating)
            .cloned()
            .collect();
        rows.sort_by(leaderboard_order);
        rows.truncate(limit);
        rows
    }

    pub fn record_category_combat(&mut self, category: &UnitCategoryId, totals: CombatTotals) {
        self.categories
            .entry(category.clone())
            .or_default()
            .absorb(totals);
    }

    pub fn combat_totals(&mut self, subject: &RatingSubject) -> CombatTotals {
        match subject {
            RatingSubject::Player(player) => self.record_mut(player).career_totals(),
            RatingSubject::UnitCategory(category) => {
                self.categories.get(category).copied().unwrap_or_default()
            }
        }
    }
}

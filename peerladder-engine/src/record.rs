//! Player rating records and the match inputs that update them.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch, as reported by the engine's [`crate::Clock`].
pub type Timestamp = i64;

/// Stable human-readable player handle ("btag").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Construct a handle, trimming surrounding whitespace.
    #[must_use]
    pub fn new(handle: &str) -> Self {
        Self(handle.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unit-type bucket used for per-category combat tallies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitCategoryId(String);

impl UnitCategoryId {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Anything the engine keeps combat totals for. Players and unit categories live
/// in separate maps, so a category can never shadow a handle with the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RatingSubject {
    Player(PlayerId),
    UnitCategory(UnitCategoryId),
}

/// Kill/death value totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTotals {
    pub kill_value: i64,
    pub death_value: i64,
}

impl CombatTotals {
    pub fn absorb(&mut self, other: Self) {
        self.kill_value = self.kill_value.saturating_add(other.kill_value);
        self.death_value = self.death_value.saturating_add(other.death_value);
    }
}

/// Speculative post-match values written before the match is confirmed complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PendingGameSnapshot {
    pub rating: f64,
    pub wins: u32,
    pub losses: u32,
    pub games_played: u32,
    pub total_kill_value: i64,
    pub total_death_value: i64,
    pub total_placement: i64,
    pub turn: u32,
    pub timestamp: Timestamp,
}

/// One record per player identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerRatingData {
    pub handle: PlayerId,
    pub rating: f64,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_kill_value: i64,
    pub total_death_value: i64,
    pub total_placement: i64,
    pub last_updated: Timestamp,
    #[serde(default = "default_show_rating")]
    pub show_rating: bool,
    /// Never persisted: a record is synced because of where it was loaded from.
    #[serde(skip)]
    pub is_synced: bool,
    #[serde(default)]
    pub pending_game: Option<PendingGameSnapshot>,
}

const fn default_show_rating() -> bool {
    true
}

impl PlayerRatingData {
    /// Placeholder for a player nobody has reported yet.
    #[must_use]
    pub fn placeholder(handle: PlayerId, starting_rating: f64) -> Self {
        Self {
            handle,
            rating: starting_rating,
            games_played: 0,
            wins: 0,
            losses: 0,
            total_kill_value: 0,
            total_death_value: 0,
            total_placement: 0,
            last_updated: 0,
            show_rating: true,
            is_synced: false,
            pending_game: None,
        }
    }

    /// Promote a staged snapshot into the authoritative fields.
    ///
    /// Returns true when a pending game was committed.
    pub fn commit_pending(&mut self) -> bool {
        let Some(pending) = self.pending_game.take() else {
            return false;
        };
        self.rating = pending.rating;
        self.wins = pending.wins;
        self.losses = pending.losses;
        self.games_played = pending.games_played;
        self.total_kill_value = pending.total_kill_value;
        self.total_death_value = pending.total_death_value;
        self.total_placement = pending.total_placement;
        self.last_updated = pending.timestamp;
        true
    }

    #[must_use]
    pub const fn career_totals(&self) -> CombatTotals {
        CombatTotals {
            kill_value: self.total_kill_value,
            death_value: self.total_death_value,
        }
    }
}

/// Who controls a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    Human,
    Computer,
}

/// Facts the match simulation reports for deciding whether a seat counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub turns_survived: u32,
    pub peak_participation: u32,
    pub controller: Controller,
}

impl Eligibility {
    #[must_use]
    pub const fn human(turns_survived: u32, peak_participation: u32) -> Self {
        Self {
            turns_survived,
            peak_participation,
            controller: Controller::Human,
        }
    }

    /// A seat counts when it took a meaningful action and, unless computer seats
    /// are allowed, a human controls it.
    #[must_use]
    pub const fn is_eligible(&self, include_computer_players: bool) -> bool {
        if self.turns_survived == 0 || self.peak_participation == 0 {
            return false;
        }
        matches!(self.controller, Controller::Human) || include_computer_players
    }
}

/// One seat's standing, as reported at a checkpoint or at match end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub player: PlayerId,
    /// 0-based finishing (or current) rank within the full field.
    pub placement: usize,
    pub eligibility: Eligibility,
    pub stats: CombatTotals,
}

impl MatchEntry {
    #[must_use]
    pub fn new(player: impl Into<PlayerId>, placement: usize, eligibility: Eligibility) -> Self {
        Self {
            player: player.into(),
            placement,
            eligibility,
            stats: CombatTotals::default(),
        }
    }

    #[must_use]
    pub const fn with_stats(mut self, stats: CombatTotals) -> Self {
        self.stats = stats;
        self
    }
}

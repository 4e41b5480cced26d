//! Peerladder rating engine
//!
//! Serverless competitive ratings for peer-to-peer matches. Every peer scores the
//! same match inputs with the same zero-sum placement curve, journals speculative
//! results so a crash never loses a game, and keeps a bounded table of other
//! players' ratings learned from peer snapshots.
//!
//! This crate has no UI or transport; the host supplies a [`RatingStorage`]
//! implementation and delivers peer snapshot bytes.

pub mod clock;
pub mod codec;
pub mod config;
pub mod constants;
pub mod engine;
pub mod formula;
pub mod identity;
pub mod numbers;
pub mod record;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tier;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{CodecError, PeerSnapshotFile, RatingFile};
pub use config::{RatingConfig, RatingConfigError, TierThresholds};
pub use engine::{LeaderboardRow, RatingEngine};
pub use formula::{
    PlacementCurve, calculate_opponent_strength_modifier, calculate_placement_points,
    calculate_rating_change,
};
pub use identity::{LocalIdentity, SlotKind, StorageSlot, fingerprint};
pub use record::{
    CombatTotals, Controller, Eligibility, MatchEntry, PendingGameSnapshot, PlayerId,
    PlayerRatingData, RatingSubject, Timestamp, UnitCategoryId,
};
pub use storage::{FileStorage, FileStorageError, MemoryStorage, MemoryStorageError, RatingStorage};
pub use store::{CheckpointOutcome, FinalizeOutcome, RatingNotice, RatingStore, SeatResult};
pub use sync::{PeerTable, leaderboard_order, merge};
pub use tier::RankTier;

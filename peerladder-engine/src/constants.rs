//! Centralized tuning constants for the rating engine.
//!
//! These values are the defaults behind [`crate::RatingConfig`]. Keeping them
//! together means the deterministic math every peer replicates can only drift
//! through reviewed code changes.

// Logging targets ----------------------------------------------------------
pub(crate) const LOG_TARGET_STORE: &str = "peerladder::store";
pub(crate) const LOG_TARGET_SYNC: &str = "peerladder::sync";
pub(crate) const LOG_TARGET_ENGINE: &str = "peerladder::engine";

// Rating scale -------------------------------------------------------------
pub const STARTING_RATING: f64 = 1_000.0;
pub const MINIMUM_RATING: f64 = 100.0;
pub const MAX_WIN: f64 = 40.0;
pub const MAX_LOSS: f64 = 40.0;
pub const BREAKEVEN_PERCENTILE: f64 = 0.5;
pub const ZERO_SUM_TARGET: i32 = 0;

// Opponent strength --------------------------------------------------------
pub const STRENGTH_FACTOR: f64 = 0.25;
pub const STRENGTH_SCALE: f64 = 400.0;

// Match eligibility --------------------------------------------------------
pub const MIN_ELIGIBLE_PLAYERS: usize = 2;

// Peer snapshots -----------------------------------------------------------
pub const PEER_RETENTION: usize = 50;

// Persistence --------------------------------------------------------------
pub const FORMAT_VERSION: u32 = 2;
pub const DEFAULT_SEASON_ID: &str = "season-1";
pub const DEFAULT_FINGERPRINT_SALT: &str = "peerladder:v1:";
pub(crate) const CHECKSUM_SEED: u64 = 0;
pub(crate) const CHECKSUM_HEX_LEN: usize = 16;
pub(crate) const RATING_FILE_PREFIX: &str = "rating-";
pub(crate) const PEER_FILE_PREFIX: &str = "peers-";
pub(crate) const FILE_EXTENSION: &str = ".dat";

// Rank tiers (ascending lower bounds) ---------------------------------------
pub const TIER_BRONZE: f64 = 0.0;
pub const TIER_SILVER: f64 = 900.0;
pub const TIER_GOLD: f64 = 1_050.0;
pub const TIER_PLATINUM: f64 = 1_200.0;
pub const TIER_DIAMOND: f64 = 1_400.0;
pub const TIER_MASTER: f64 = 1_650.0;

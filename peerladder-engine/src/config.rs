//! Rating configuration and its invariants.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;

/// Ascending lower bounds for each ranked tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub bronze: f64,
    pub silver: f64,
    pub gold: f64,
    pub platinum: f64,
    pub diamond: f64,
    pub master: f64,
}

impl TierThresholds {
    fn as_array(&self) -> [(&'static str, f64); 6] {
        [
            ("bronze", self.bronze),
            ("silver", self.silver),
            ("gold", self.gold),
            ("platinum", self.platinum),
            ("diamond", self.diamond),
            ("master", self.master),
        ]
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            bronze: constants::TIER_BRONZE,
            silver: constants::TIER_SILVER,
            gold: constants::TIER_GOLD,
            platinum: constants::TIER_PLATINUM,
            diamond: constants::TIER_DIAMOND,
            master: constants::TIER_MASTER,
        }
    }
}

/// Engine-wide tuning. Every peer in a match must run with the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    #[serde(default = "RatingConfig::default_starting_rating")]
    pub starting_rating: f64,
    #[serde(default = "RatingConfig::default_minimum_rating")]
    pub minimum_rating: f64,
    #[serde(default = "RatingConfig::default_max_win")]
    pub max_win: f64,
    #[serde(default = "RatingConfig::default_max_loss")]
    pub max_loss: f64,
    #[serde(default = "RatingConfig::default_breakeven_percentile")]
    pub breakeven_percentile: f64,
    #[serde(default)]
    pub zero_sum_target: i32,
    /// Scale `k` of the opponent-strength modifier; the modifier stays in `[1 - k, 1 + k]`.
    #[serde(default = "RatingConfig::default_strength_factor")]
    pub strength_factor: f64,
    #[serde(default = "RatingConfig::default_strength_scale")]
    pub strength_scale: f64,
    #[serde(default = "RatingConfig::default_min_eligible_players")]
    pub min_eligible_players: usize,
    #[serde(default)]
    pub include_computer_players: bool,
    /// Upper bound `N` on the peer snapshot table.
    #[serde(default = "RatingConfig::default_peer_retention")]
    pub peer_retention: usize,
    #[serde(default = "RatingConfig::default_season_id")]
    pub season_id: String,
    #[serde(default = "RatingConfig::default_fingerprint_salt")]
    pub fingerprint_salt: String,
    #[serde(default)]
    pub rank_tiers: TierThresholds,
}

impl RatingConfig {
    #[must_use]
    pub const fn default_starting_rating() -> f64 {
        constants::STARTING_RATING
    }

    #[must_use]
    pub const fn default_minimum_rating() -> f64 {
        constants::MINIMUM_RATING
    }

    #[must_use]
    pub const fn default_max_win() -> f64 {
        constants::MAX_WIN
    }

    #[must_use]
    pub const fn default_max_loss() -> f64 {
        constants::MAX_LOSS
    }

    #[must_use]
    pub const fn default_breakeven_percentile() -> f64 {
        constants::BREAKEVEN_PERCENTILE
    }

    #[must_use]
    pub const fn default_strength_factor() -> f64 {
        constants::STRENGTH_FACTOR
    }

    #[must_use]
    pub const fn default_strength_scale() -> f64 {
        constants::STRENGTH_SCALE
    }

    #[must_use]
    pub const fn default_min_eligible_players() -> usize {
        constants::MIN_ELIGIBLE_PLAYERS
    }

    #[must_use]
    pub const fn default_peer_retention() -> usize {
        constants::PEER_RETENTION
    }

    #[must_use]
    pub fn default_season_id() -> String {
        constants::DEFAULT_SEASON_ID.to_string()
    }

    #[must_use]
    pub fn default_fingerprint_salt() -> String {
        constants::DEFAULT_FINGERPRINT_SALT.to_string()
    }

    /// Parse a (possibly partial) JSON document; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `RatingConfigError::Parse` for malformed JSON, or any validation error.
    pub fn from_json(json: &str) -> Result<Self, RatingConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `RatingConfigError` when any field violates its documented bounds.
    pub fn validate(&self) -> Result<(), RatingConfigError> {
        if self.minimum_rating > self.starting_rating {
            return Err(RatingConfigError::FloorAboveStart {
                minimum: self.minimum_rating,
                starting: self.starting_rating,
            });
        }
        for (field, value) in [
            ("max_win", self.max_win),
            ("max_loss", self.max_loss),
            ("strength_scale", self.strength_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(RatingConfigError::NotPositive { field, value });
            }
        }
        if !(self.breakeven_percentile > 0.0 && self.breakeven_percentile < 1.0) {
            return Err(RatingConfigError::RangeViolation {
                field: "breakeven_percentile",
                min: 0.0,
                max: 1.0,
                value: self.breakeven_percentile,
            });
        }
        if !(0.0..=1.0).contains(&self.strength_factor) {
            return Err(RatingConfigError::RangeViolation {
                field: "strength_factor",
                min: 0.0,
                max: 1.0,
                value: self.strength_factor,
            });
        }
        if self.min_eligible_players < 2 {
            return Err(RatingConfigError::MinEligible(self.min_eligible_players));
        }
        if self.peer_retention == 0 {
            return Err(RatingConfigError::ZeroRetention);
        }
        if self.season_id.trim().is_empty() {
            return Err(RatingConfigError::EmptySeason);
        }
        self.validate_tiers()
    }

    fn validate_tiers(&self) -> Result<(), RatingConfigError> {
        let tiers = self.rank_tiers.as_array();
        for pair in tiers.windows(2) {
            let [(_, lower), (tier, upper)] = pair else {
                continue;
            };
            if upper <= lower {
                return Err(RatingConfigError::TierOrder { tier: *tier });
            }
        }
        Ok(())
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            starting_rating: Self::default_starting_rating(),
            minimum_rating: Self::default_minimum_rating(),
            max_win: Self::default_max_win(),
            max_loss: Self::default_max_loss(),
            breakeven_percentile: Self::default_breakeven_percentile(),
            zero_sum_target: constants::ZERO_SUM_TARGET,
            strength_factor: Self::default_strength_factor(),
            strength_scale: Self::default_strength_scale(),
            min_eligible_players: Self::default_min_eligible_players(),
            include_computer_players: false,
            peer_retention: Self::default_peer_retention(),
            season_id: Self::default_season_id(),
            fingerprint_salt: Self::default_fingerprint_salt(),
            rank_tiers: TierThresholds::default(),
        }
    }
}

/// Errors raised when rating configuration invariants are violated.
#[derive(Debug, Error)]
pub enum RatingConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("minimum rating {minimum:.1} exceeds starting rating {starting:.1}")]
    FloorAboveStart { minimum: f64, starting: f64 },
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("at least two eligible players are required (got {0})")]
    MinEligible(usize),
    #[error("peer retention must hold at least one record")]
    ZeroRetention,
    #[error("season id must not be empty")]
    EmptySeason,
    #[error("rank tier {tier} must start above the tier below it")]
    TierOrder { tier: &'static str },
}

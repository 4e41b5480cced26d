//! Rank tiers derived from rating thresholds.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::TierThresholds;
use crate::record::PlayerRatingData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankTier {
    /// No completed games yet.
    Unranked,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
}

impl RankTier {
    /// Highest tier whose lower bound `rating` reaches.
    #[must_use]
    pub fn from_rating(rating: f64, thresholds: &TierThresholds) -> Self {
        if rating >= thresholds.master {
            Self::Master
        } else if rating >= thresholds.diamond {
            Self::Diamond
        } else if rating >= thresholds.platinum {
            Self::Platinum
        } else if rating >= thresholds.gold {
            Self::Gold
        } else if rating >= thresholds.silver {
            Self::Silver
        } else {
            Self::Bronze
        }
    }

    #[must_use]
    pub fn for_record(record: &PlayerRatingData, thresholds: &TierThresholds) -> Self {
        if record.games_played == 0 {
            return Self::Unranked;
        }
        Self::from_rating(record.rating, thresholds)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unranked => "unranked",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Diamond => "diamond",
            Self::Master => "master",
        }
    }

    /// Asset key of the rank icon shown next to a player.
    #[must_use]
    pub fn icon_key(self) -> String {
        format!("rank.icon.{}", self.as_str())
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

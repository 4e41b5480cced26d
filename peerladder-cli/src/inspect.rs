use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use peerladder_engine::{
    CodecError, FileStorage, LeaderboardRow, LocalIdentity, PeerSnapshotFile, PlayerId,
    PlayerRatingData, RankTier, RatingConfig, RatingFile, RatingStorage, StorageSlot,
};

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub handle: String,
    pub rating: f64,
    pub tier: RankTier,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub show_rating: bool,
    /// Turn of a journaled, uncommitted match, if any.
    pub pending_turn: Option<u32>,
}

impl RecordSummary {
    fn from_record(record: &PlayerRatingData, config: &RatingConfig) -> Self {
        Self {
            handle: record.handle.as_str().to_string(),
            rating: record.rating,
            tier: RankTier::for_record(record, &config.rank_tiers),
            games_played: record.games_played,
            wins: record.wins,
            losses: record.losses,
            show_rating: record.show_rating,
            pending_turn: record.pending_game.as_ref().map(|pending| pending.turn),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus<T> {
    Missing { file: String },
    Valid { file: String, contents: T },
    Rejected { file: String, reason: String, corrupt: bool },
}

impl<T> FileStatus<T> {
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Rejected { corrupt: true, .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub local: String,
    pub season_id: String,
    pub rating_file: FileStatus<RecordSummary>,
    pub peer_file: FileStatus<Vec<LeaderboardRow>>,
}

impl InspectionReport {
    #[must_use]
    pub fn has_corruption(&self) -> bool {
        self.rating_file.is_corrupt() || self.peer_file.is_corrupt()
    }
}

fn examine<T, F>(storage: &FileStorage, slot: &StorageSlot, decode: F) -> Result<FileStatus<T>>
where
    F: FnOnce(&[u8]) -> Result<T, CodecError>,
{
    let file = slot.file_name();
    let Some(bytes) = storage
        .read(slot)
        .with_context(|| format!("reading {}", storage.path_for(slot).display()))?
    else {
        return Ok(FileStatus::Missing { file });
    };
    Ok(match decode(&bytes) {
        Ok(contents) => FileStatus::Valid { file, contents },
        Err(err) => FileStatus::Rejected {
            file,
            corrupt: err.is_corruption(),
            reason: err.to_string(),
        },
    })
}

/// Decode the local identity's two files without modifying them.
///
/// # Errors
///
/// Returns an error only when a file exists but cannot be read.
pub fn run(dir: &Path, local: &str, config: &RatingConfig) -> Result<InspectionReport> {
    let storage = FileStorage::new(dir);
    let identity = LocalIdentity::new(PlayerId::new(local), &config.fingerprint_salt);

    let rating_file = examine(&storage, &identity.rating_slot(), |bytes| {
        RatingFile::decode(bytes, &config.season_id)
            .map(|file| RecordSummary::from_record(&file.player, config))
    })?;
    let peer_file = examine(&storage, &identity.peer_slot(), |bytes| {
        PeerSnapshotFile::decode(bytes, &config.season_id).map(|file| {
            file.players
                .iter()
                .enumerate()
                .map(|(idx, record)| LeaderboardRow {
                    position: idx + 1,
                    handle: record.handle.as_str().to_string(),
                    rating: record.rating,
                    games_played: record.games_played,
                    wins: record.wins,
                    losses: record.losses,
                    tier: RankTier::for_record(record, &config.rank_tiers),
                })
                .collect()
        })
    })?;

    Ok(InspectionReport {
        local: local.to_string(),
        season_id: config.season_id.clone(),
        rating_file,
        peer_file,
    })
}

//! Checksummed on-disk formats for rating files and peer snapshots.
//!
//! Layout: `<16 lowercase hex digits>\n<compact JSON payload>`. The header is the
//! XxHash64 of the payload bytes exactly as stored, so any edit to either part is
//! caught before a single field is trusted. The checksum guards against accidental
//! corruption only; it is not a signature.

use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::constants::{CHECKSUM_HEX_LEN, CHECKSUM_SEED, FORMAT_VERSION};
use crate::record::PlayerRatingData;

/// Reasons a stored or received payload was rejected.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is missing its checksum header")]
    MissingHeader,
    #[error("checksum header is not 16 lowercase hex digits")]
    BadHeader,
    #[error("checksum mismatch (stored {stored:016x}, computed {computed:016x})")]
    ChecksumMismatch { stored: u64, computed: u64 },
    #[error("payload does not parse: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("format version {found} is not supported (newest is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("record belongs to season {found:?}, expected {expected:?}")]
    SeasonMismatch { found: String, expected: String },
    #[error("snapshot declares {declared} players but carries {actual}")]
    CountMismatch { declared: u32, actual: usize },
}

impl CodecError {
    /// True when the bytes themselves are damaged, as opposed to well-formed data
    /// that simply does not apply (another season, a newer format).
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        !matches!(
            self,
            Self::SeasonMismatch { .. } | Self::UnsupportedVersion { .. }
        )
    }
}

fn checksum(payload: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(CHECKSUM_SEED);
    hasher.write(payload);
    hasher.finish()
}

fn seal(payload: &[u8]) -> (Vec<u8>, u64) {
    let sum = checksum(payload);
    let mut out = Vec::with_capacity(CHECKSUM_HEX_LEN + 1 + payload.len());
    out.extend_from_slice(format!("{sum:016x}\n").as_bytes());
    out.extend_from_slice(payload);
    (out, sum)
}

fn parse_header(header: &[u8]) -> Result<u64, CodecError> {
    let mut value: u64 = 0;
    for byte in header {
        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            _ => return Err(CodecError::BadHeader),
        };
        value = (value << 4) | u64::from(nibble);
    }
    Ok(value)
}

fn unseal(bytes: &[u8]) -> Result<(&[u8], u64), CodecError> {
    if bytes.len() <= CHECKSUM_HEX_LEN {
        return Err(CodecError::MissingHeader);
    }
    let (header, rest) = bytes.split_at(CHECKSUM_HEX_LEN);
    let Some((&b'\n', payload)) = rest.split_first() else {
        return Err(CodecError::MissingHeader);
    };
    let stored = parse_header(header)?;
    let computed = checksum(payload);
    if stored != computed {
        return Err(CodecError::ChecksumMismatch { stored, computed });
    }
    Ok((payload, stored))
}

fn check_version(found: u32) -> Result<(), CodecError> {
    if found == 0 || found > FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found,
            supported: FORMAT_VERSION,
        });
    }
    Ok(())
}

fn check_season(found: &str, expected: &str) -> Result<(), CodecError> {
    if found != expected {
        return Err(CodecError::SeasonMismatch {
            found: found.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}

/// Durable record of the local identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingFile {
    pub version: u32,
    pub season_id: String,
    /// Filled from the header on decode and by [`RatingFile::encode`].
    #[serde(skip)]
    pub checksum: u64,
    pub player: PlayerRatingData,
}

impl RatingFile {
    #[must_use]
    pub fn new(season_id: &str, player: PlayerRatingData) -> Self {
        Self {
            version: FORMAT_VERSION,
            season_id: season_id.to_string(),
            checksum: 0,
            player,
        }
    }

    /// Serialize and seal, recording the checksum on `self`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Payload` if the record cannot be serialized.
    pub fn encode(&mut self) -> Result<Vec<u8>, CodecError> {
        let payload = serde_json::to_vec(self)?;
        let (bytes, sum) = seal(&payload);
        self.checksum = sum;
        Ok(bytes)
    }

    /// Verify and parse a sealed rating file for `season_id`.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` on any header, checksum, parse, version, or season failure.
    pub fn decode(bytes: &[u8], season_id: &str) -> Result<Self, CodecError> {
        let (payload, sum) = unseal(bytes)?;
        let mut file: Self = serde_json::from_slice(payload)?;
        check_version(file.version)?;
        check_season(&file.season_id, season_id)?;
        file.checksum = sum;
        file.player.is_synced = true;
        Ok(file)
    }
}

/// Bounded table of other players as observed by one local identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerSnapshotFile {
    pub version: u32,
    pub season_id: String,
    #[serde(skip)]
    pub checksum: u64,
    pub players: Vec<PlayerRatingData>,
    pub player_count: u32,
}

impl PeerSnapshotFile {
    #[must_use]
    pub fn new(season_id: &str, players: Vec<PlayerRatingData>) -> Self {
        let player_count = u32::try_from(players.len()).unwrap_or(u32::MAX);
        Self {
            version: FORMAT_VERSION,
            season_id: season_id.to_string(),
            checksum: 0,
            players,
            player_count,
        }
    }

    /// Serialize and seal, recording the checksum on `self`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Payload` if the snapshot cannot be serialized.
    pub fn encode(&mut self) -> Result<Vec<u8>, CodecError> {
        let payload = serde_json::to_vec(self)?;
        let (bytes, sum) = seal(&payload);
        self.checksum = sum;
        Ok(bytes)
    }

    /// Verify and parse a sealed snapshot for `season_id`.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` on any header, checksum, parse, version, season, or count failure.
    pub fn decode(bytes: &[u8], season_id: &str) -> Result<Self, CodecError> {
        let (payload, sum) = unseal(bytes)?;
        let mut file: Self = serde_json::from_slice(payload)?;
        check_version(file.version)?;
        check_season(&file.season_id, season_id)?;
        if usize::try_from(file.player_count).ok() != Some(file.players.len()) {
            return Err(CodecError::CountMismatch {
                declared: file.player_count,
                actual: file.players.len(),
            });
        }
        file.checksum = sum;
        for player in &mut file.players {
            player.is_synced = true;
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PendingGameSnapshot, PlayerId};

    const SEASON: &str = "season-test";

    fn sample(handle: &str, rating: f64) -> PlayerRatingData {
        let mut record = PlayerRatingData::placeholder(PlayerId::new(handle), rating);
        record.games_played = 12;
        record.wins = 4;
        record.losses = 8;
        record.total_kill_value = 3_400;
        record.total_death_value = 2_100;
        record.total_placement = 31;
        record.last_updated = 1_720_000_000;
        record.is_synced = true;
        record
    }

    #[test]
    fn rating_file_roundtrips() {
        let mut record = sample("ana#1", 1_044.0);
        record.pending_game = Some(PendingGameSnapshot {
            rating: 1_070.0,
            wins: 5,
            losses: 8,
            games_played: 13,
            total_kill_value: 3_500,
            total_death_value: 2_150,
            total_placement: 31,
            turn: 40,
            timestamp: 1_720_000_500,
        });
        let mut file = RatingFile::new(SEASON, record);
        let bytes = file.encode().unwrap();
        let decoded = RatingFile::decode(&bytes, SEASON).unwrap();
        assert_eq!(decoded, file);
        assert_ne!(decoded.checksum, 0);
    }

    #[test]
    fn every_single_byte_mutation_is_rejected() {
        let mut file = RatingFile::new(SEASON, sample("mut#9", 987.5));
        let bytes = file.encode().unwrap();
        for idx in 0..bytes.len() {
            for mask in [0x01_u8, 0x20, 0x80] {
                let mut damaged = bytes.clone();
                damaged[idx] ^= mask;
                assert!(
                    RatingFile::decode(&damaged, SEASON).is_err(),
                    "mutation at byte {idx} (mask {mask:#04x}) went undetected"
                );
            }
        }
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        let mut file = RatingFile::new(SEASON, sample("cut#2", 1_000.0));
        let bytes = file.encode().unwrap();
        assert!(matches!(
            RatingFile::decode(&bytes[..10], SEASON),
            Err(CodecError::MissingHeader)
        ));
        assert!(RatingFile::decode(&bytes[..bytes.len() - 1], SEASON).is_err());
        assert!(RatingFile::decode(&[], SEASON).is_err());
    }

    #[test]
    fn other_season_is_not_corruption() {
        let mut file = RatingFile::new("season-0", sample("old#1", 1_300.0));
        let bytes = file.encode().unwrap();
        let err = RatingFile::decode(&bytes, SEASON).unwrap_err();
        assert!(matches!(err, CodecError::SeasonMismatch { .. }));
        assert!(!err.is_corruption());
    }

    #[test]
    fn version_one_files_migrate_show_rating() {
        let payload = format!(
            concat!(
                r#"{{"version":1,"season_id":"{}","player":{{"handle":"v1#7","rating":1010.0,"#,
                r#""games_played":1,"wins":1,"losses":0,"total_kill_value":5,"total_death_value":2,"#,
                r#""total_placement":0,"last_updated":99}}}}"#
            ),
            SEASON
        );
        let (bytes, _) = seal(payload.as_bytes());
        let file = RatingFile::decode(&bytes, SEASON).unwrap();
        assert!(file.player.show_rating);
        assert!(file.player.is_synced);
        assert_eq!(file.player.handle.as_str(), "v1#7");
    }

    #[test]
    fn future_versions_are_refused() {
        let mut file = RatingFile::new(SEASON, sample("new#1", 1_000.0));
        file.version = FORMAT_VERSION + 1;
        let bytes = file.encode().unwrap();
        assert!(matches!(
            RatingFile::decode(&bytes, SEASON),
            Err(CodecError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn peer_snapshot_roundtrips_and_checks_count() {
        let players = vec![sample("a#1", 1_200.0), sample("b#2", 1_100.0)];
        let mut snapshot = PeerSnapshotFile::new(SEASON, players);
        let bytes = snapshot.encode().unwrap();
        let decoded = PeerSnapshotFile::decode(&bytes, SEASON).unwrap();
        assert_eq!(decoded.players.len(), 2);
        assert_eq!(decoded, snapshot);

        snapshot.player_count = 5;
        let bytes = snapshot.encode().unwrap();
        assert!(matches!(
            PeerSnapshotFile::decode(&bytes, SEASON),
            Err(CodecError::CountMismatch {
                declared: 5,
                actual: 2
            })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let payload = format!(
            r#"{{"version":2,"season_id":"{SEASON}","players":[],"player_count":0,"extra":1}}"#
        );
        let (bytes, _) = seal(payload.as_bytes());
        assert!(matches!(
            PeerSnapshotFile::decode(&bytes, SEASON),
            Err(CodecError::Payload(_))
        ));
    }
}

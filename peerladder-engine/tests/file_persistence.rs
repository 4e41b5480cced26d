use std::hash::Hasher;
use std::path::{Path, PathBuf};

use peerladder_engine::{
    Eligibility, FileStorage, FixedClock, LocalIdentity, MatchEntry, PlayerId, RatingConfig,
    RatingEngine, RatingFile, RatingNotice,
};
use twox_hash::XxHash64;

fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "peerladder-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn local() -> LocalIdentity {
    LocalIdentity::new(PlayerId::new("host#1"), &RatingConfig::default().fingerprint_salt)
}

fn open(dir: &Path, config: RatingConfig) -> RatingEngine<FileStorage, FixedClock> {
    RatingEngine::with_clock(config, FileStorage::new(dir), FixedClock::at(42_000), Some(local()))
        .unwrap()
}

fn field(order: &[&str]) -> Vec<MatchEntry> {
    order
        .iter()
        .enumerate()
        .map(|(placement, handle)| MatchEntry::new(*handle, placement, Eligibility::human(15, 2)))
        .collect()
}

#[test]
fn finalized_rating_survives_a_restart() {
    let dir = temp_dir("restart");
    let me = PlayerId::new("host#1");
    let after = {
        let mut engine = open(&dir, RatingConfig::default());
        engine.finalize(&field(&["host#1", "guest#2", "guest#3"]));
        engine.get_rating(&me)
    };

    let mut reopened = open(&dir, RatingConfig::default());
    assert!((reopened.get_rating(&me) - after).abs() < f64::EPSILON);
    assert_eq!(reopened.player_record(&me).wins, 1);
    let guest = reopened.player_record(&PlayerId::new("guest#3")).clone();
    assert!(guest.is_synced);
    assert_eq!(guest.losses, 1);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn files_carry_an_xxhash_header_and_no_handle_in_the_name() {
    let dir = temp_dir("format");
    let mut engine = open(&dir, RatingConfig::default());
    engine.finalize(&field(&["guest#2", "host#1"]));

    let path = FileStorage::new(&dir).path_for(&local().rating_slot());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("rating-") && name.ends_with(".dat"));
    assert!(!name.contains("host"));

    let bytes = std::fs::read(&path).unwrap();
    let (header, payload) = bytes.split_at(16);
    assert_eq!(payload[0], b'\n');
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&payload[1..]);
    assert_eq!(std::str::from_utf8(header).unwrap(), format!("{:016x}", hasher.finish()));

    let decoded = RatingFile::decode(&bytes, &RatingConfig::default().season_id).unwrap();
    assert_eq!(decoded.player.handle, PlayerId::new("host#1"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn checkpoint_on_disk_is_committed_after_a_crash() {
    let dir = temp_dir("crash");
    let me = PlayerId::new("host#1");
    let staged = {
        let mut engine = open(&dir, RatingConfig::default());
        engine.begin_match();
        engine.checkpoint(&field(&["host#1", "guest#2"]), 12);
        engine.player_record(&me).pending_game.clone().unwrap()
    };

    let mut reopened = open(&dir, RatingConfig::default());
    let record = reopened.player_record(&me).clone();
    assert!(record.pending_game.is_none());
    assert!((record.rating - staged.rating).abs() < f64::EPSILON);
    assert_eq!(record.games_played, staged.games_played);
    assert!(reopened.drain_notices().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn edited_file_is_reset_with_a_player_facing_notice() {
    let dir = temp_dir("edited");
    {
        let mut engine = open(&dir, RatingConfig::default());
        engine.finalize(&field(&["host#1", "guest#2"]));
    }
    let path = FileStorage::new(&dir).path_for(&local().rating_slot());
    let text = std::fs::read_to_string(&path).unwrap();
    let edited = text.replace("\"rating\":1020.0", "\"rating\":9020.0");
    assert_ne!(edited, text);
    std::fs::write(&path, edited).unwrap();

    let mut reopened = open(&dir, RatingConfig::default());
    assert!((reopened.get_rating(&PlayerId::new("host#1")) - 1_000.0).abs() < f64::EPSILON);
    let notices = reopened.drain_notices();
    assert!(matches!(notices.as_slice(), [RatingNotice::CorruptFile { .. }]));
    assert!(notices[0].is_player_facing());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn new_season_starts_fresh_without_warnings() {
    let dir = temp_dir("season");
    {
        let mut engine = open(&dir, RatingConfig::default());
        engine.finalize(&field(&["host#1", "guest#2"]));
    }
    let next = RatingConfig {
        season_id: "season-2".to_string(),
        ..RatingConfig::default()
    };
    let mut reopened = open(&dir, next);
    assert!((reopened.get_rating(&PlayerId::new("host#1")) - 1_000.0).abs() < f64::EPSILON);
    assert!(reopened.drain_notices().iter().all(|n| !n.is_player_facing()));
    std::fs::remove_dir_all(&dir).ok();
}

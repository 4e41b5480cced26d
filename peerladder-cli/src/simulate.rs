use anyhow::{Context, Result, bail};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::PathBuf;

use peerladder_engine::{
    Controller, Eligibility, FileStorage, FinalizeOutcome, LeaderboardRow, LocalIdentity,
    MatchEntry, PlayerId, RankTier, RatingConfig, RatingEngine,
};

/// Odds that a seat idles through a match and is ineligible.
const IDLE_SEAT_CHANCE: f64 = 0.1;
const MAX_PEAK_PARTICIPATION: u32 = 6;

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub dir: PathBuf,
    pub local: String,
    pub players: Vec<String>,
    pub matches: usize,
    pub seed: u64,
    pub turns: u32,
    pub config: RatingConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatLine {
    pub handle: String,
    pub rank: usize,
    pub delta: i32,
    pub new_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Committed { seats: Vec<SeatLine> },
    Skipped { eligible: usize, required: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub index: usize,
    pub placements: Vec<String>,
    pub idle: Vec<String>,
    #[serde(flatten)]
    pub outcome: MatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub local: String,
    pub local_rating: f64,
    pub local_tier: RankTier,
    pub matches: Vec<MatchSummary>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub notices: Vec<String>,
}

/// Roster in first-seen order with the local handle always seated.
fn roster(local: &str, players: &[String]) -> Vec<String> {
    let mut seated: Vec<String> = Vec::with_capacity(players.len() + 1);
    for handle in std::iter::once(local).chain(players.iter().map(String::as_str)) {
        if !seated.iter().any(|seen| seen == handle) {
            seated.push(handle.to_string());
        }
    }
    seated
}

struct Seat {
    handle: String,
    peak: u32,
}

fn entries_at(seats: &[Seat], turn: u32) -> Vec<MatchEntry> {
    seats
        .iter()
        .enumerate()
        .map(|(placement, seat)| {
            let eligibility = Eligibility {
                turns_survived: turn,
                peak_participation: seat.peak,
                controller: Controller::Human,
            };
            MatchEntry::new(seat.handle.as_str(), placement, eligibility)
        })
        .collect()
}

/// Play `plan.matches` seeded matches, journaling every turn before the final commit.
///
/// # Errors
///
/// Returns an error if the plan is empty or the configuration is invalid.
pub fn run(plan: &SimulationPlan) -> Result<SimulationReport> {
    if plan.turns == 0 {
        bail!("a match needs at least one turn");
    }
    let mut roster = roster(&plan.local, &plan.players);
    if roster.len() < 2 {
        bail!("need at least two players, got {}", roster.len());
    }

    let local = PlayerId::new(&plan.local);
    let identity = LocalIdentity::new(local.clone(), &plan.config.fingerprint_salt);
    let mut engine = RatingEngine::new(plan.config.clone(), FileStorage::new(&plan.dir), Some(identity))
        .context("invalid rating configuration")?;
    let mut rng = ChaCha8Rng::seed_from_u64(plan.seed);
    let mut matches = Vec::with_capacity(plan.matches);

    for index in 1..=plan.matches {
        roster.shuffle(&mut rng);
        let seats: Vec<Seat> = roster
            .iter()
            .map(|handle| Seat {
                handle: handle.clone(),
                peak: if rng.gen_bool(IDLE_SEAT_CHANCE) {
                    0
                } else {
                    rng.gen_range(1..=MAX_PEAK_PARTICIPATION)
                },
            })
            .collect();

        engine.begin_match();
        for turn in 1..=plan.turns {
            let outcome = engine.checkpoint(&entries_at(&seats, turn), turn);
            debug!("match {index} turn {turn}: {outcome:?}");
        }
        let outcome = match engine.finalize(&entries_at(&seats, plan.turns)) {
            FinalizeOutcome::Committed(results) => MatchOutcome::Committed {
                seats: results
                    .into_iter()
                    .map(|seat| SeatLine {
                        handle: seat.player.as_str().to_string(),
                        rank: seat.rank,
                        delta: seat.applied_delta,
                        new_rating: seat.new_rating,
                    })
                    .collect(),
            },
            FinalizeOutcome::Skipped { eligible, required } => {
                MatchOutcome::Skipped { eligible, required }
            }
            FinalizeOutcome::AlreadyFinalized => continue,
        };
        info!("match {index} of {} finalized", plan.matches);
        matches.push(MatchSummary {
            index,
            placements: roster.clone(),
            idle: seats
                .iter()
                .filter(|seat| seat.peak == 0)
                .map(|seat| seat.handle.clone())
                .collect(),
            outcome,
        });
    }

    let leaderboard = engine.top_players(roster.len());
    let notices = engine
        .drain_notices()
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(SimulationReport {
        seed: plan.seed,
        local: plan.local.clone(),
        local_rating: engine.get_rating(&local),
        local_tier: engine.player_tier(&local),
        matches,
        leaderboard,
        notices,
    })
}

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use peerladder_engine::LeaderboardRow;

use crate::inspect::{FileStatus, InspectionReport, RecordSummary};
use crate::simulate::{MatchOutcome, SimulationReport};

pub fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_leaderboard(out: &mut dyn Write, rows: &[LeaderboardRow]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "  (no synced players)")?;
        return Ok(());
    }
    for row in rows {
        writeln!(
            out,
            "  {:>3}. {:<20} {:>7.0}  {:<9} {}W/{}L ({} games)",
            row.position,
            row.handle,
            row.rating,
            row.tier.as_str(),
            row.wins,
            row.losses,
            row.games_played
        )?;
    }
    Ok(())
}

pub fn write_simulation_console(out: &mut dyn Write, report: &SimulationReport) -> Result<()> {
    writeln!(out, "{}", "🏆 Peerladder Simulation".bright_cyan().bold())?;
    writeln!(out, "{}", "========================".cyan())?;
    writeln!(out, "Seed: {}  Local: {}", report.seed, report.local.bold())?;
    writeln!(out)?;

    for summary in &report.matches {
        match &summary.outcome {
            MatchOutcome::Committed { seats } => {
                writeln!(out, "Match {} {}", summary.index, "committed".green())?;
                for seat in seats {
                    let delta = format!("{:+}", seat.delta);
                    let delta = if seat.delta >= 0 { delta.green() } else { delta.red() };
                    writeln!(
                        out,
                        "  #{} {:<20} {:>5} -> {:.0}",
                        seat.rank + 1,
                        seat.handle,
                        delta,
                        seat.new_rating
                    )?;
                }
            }
            MatchOutcome::Skipped { eligible, required } => {
                writeln!(
                    out,
                    "Match {} {} ({eligible} eligible, {required} required)",
                    summary.index,
                    "skipped".yellow()
                )?;
            }
        }
        if !summary.idle.is_empty() {
            writeln!(out, "  idle: {}", summary.idle.join(", "))?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "📊 Leaderboard".bright_yellow().bold())?;
    write_leaderboard(out, &report.leaderboard)?;
    writeln!(
        out,
        "Local rating: {:.0} ({})",
        report.local_rating,
        report.local_tier.as_str()
    )?;
    for notice in &report.notices {
        writeln!(out, "⚠️  {}", notice.yellow())?;
    }
    Ok(())
}

fn write_status<T>(
    out: &mut dyn Write,
    label: &str,
    status: &FileStatus<T>,
    body: impl FnOnce(&mut dyn Write, &T) -> Result<()>,
) -> Result<()> {
    match status {
        FileStatus::Missing { file } => {
            writeln!(out, "{label}: {} ({file})", "missing".dimmed())?;
        }
        FileStatus::Valid { file, contents } => {
            writeln!(out, "{label}: {} ({file})", "valid".green())?;
            body(out, contents)?;
        }
        FileStatus::Rejected {
            file,
            reason,
            corrupt,
        } => {
            let verdict = if *corrupt {
                "corrupt".red()
            } else {
                "ignored".yellow()
            };
            writeln!(out, "{label}: {verdict} ({file})")?;
            writeln!(out, "  {reason}")?;
        }
    }
    Ok(())
}

fn write_record(out: &mut dyn Write, record: &RecordSummary) -> Result<()> {
    writeln!(
        out,
        "  {} {:.0} {} {}W/{}L ({} games){}",
        record.handle.bold(),
        record.rating,
        record.tier.as_str(),
        record.wins,
        record.losses,
        record.games_played,
        if record.show_rating { "" } else { " [hidden]" }
    )?;
    if let Some(turn) = record.pending_turn {
        writeln!(out, "  pending match journaled at turn {turn}")?;
    }
    Ok(())
}

pub fn write_inspection_console(out: &mut dyn Write, report: &InspectionReport) -> Result<()> {
    writeln!(out, "{}", "🔎 Peerladder Files".bright_cyan().bold())?;
    writeln!(out, "Local: {}  Season: {}", report.local.bold(), report.season_id)?;
    write_status(out, "Rating file", &report.rating_file, write_record)?;
    write_status(out, "Peer file", &report.peer_file, |out, rows| {
        write_leaderboard(out, rows)
    })?;
    Ok(())
}

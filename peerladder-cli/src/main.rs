mod inspect;
mod report;
mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use peerladder_engine::{LocalIdentity, PlayerId, RatingConfig};
use simulate::SimulationPlan;

#[derive(Debug, Parser)]
#[command(name = "peerladder", version)]
#[command(about = "Drive the peerladder rating engine: seeded simulations, file inspection, fingerprints")]
struct Cli {
    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play seeded matches against a storage directory and print the leaderboard
    Simulate(SimulateArgs),
    /// Decode the local identity's rating and peer files
    Inspect(InspectArgs),
    /// Print the file names derived for a handle
    Fingerprint {
        handle: String,
        /// Salt mixed into the fingerprint (defaults to the built-in salt)
        #[arg(long)]
        salt: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
struct SimulateArgs {
    /// Directory holding the local rating files
    #[arg(long)]
    dir: PathBuf,

    /// Handle this process plays as
    #[arg(long)]
    local: String,

    /// Other players (comma-separated)
    #[arg(long, default_value = "rival#2,rival#3,rival#4")]
    players: String,

    /// Number of matches to play
    #[arg(long, default_value_t = 5)]
    matches: usize,

    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Turns per match; every turn is checkpointed
    #[arg(long, default_value_t = 10)]
    turns: u32,

    /// JSON file overriding rating configuration fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit JSON instead of console output
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
struct InspectArgs {
    #[arg(long)]
    dir: PathBuf,

    #[arg(long)]
    local: String,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut output_target = OutputTarget::new(cli.output.as_deref())?;
    let healthy = run(&cli.command, &mut output_target)?;
    output_target.flush_inner()?;
    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns false when inspected files turned out to be corrupt.
fn run(command: &Command, out: &mut OutputTarget) -> Result<bool> {
    match command {
        Command::Simulate(args) => {
            let plan = SimulationPlan {
                dir: args.dir.clone(),
                local: args.local.clone(),
                players: split_csv(&args.players),
                matches: args.matches,
                seed: args.seed,
                turns: args.turns,
                config: load_config(args.config.as_deref())?,
            };
            let report = simulate::run(&plan)?;
            if args.json {
                report::write_json(out.writer(), &report)?;
            } else {
                report::write_simulation_console(out.writer(), &report)?;
            }
            Ok(true)
        }
        Command::Inspect(args) => {
            let config = load_config(args.config.as_deref())?;
            let report = inspect::run(&args.dir, &args.local, &config)?;
            if args.json {
                report::write_json(out.writer(), &report)?;
            } else {
                report::write_inspection_console(out.writer(), &report)?;
            }
            if report.has_corruption() {
                eprintln!("{}", "❌ corrupt rating data found".red());
            }
            Ok(!report.has_corruption())
        }
        Command::Fingerprint { handle, salt } => {
            let salt = salt.clone().unwrap_or_else(RatingConfig::default_fingerprint_salt);
            let identity = LocalIdentity::new(PlayerId::new(handle), &salt);
            let writer = out.writer();
            writeln!(writer, "{}", identity.rating_slot().file_name())?;
            writeln!(writer, "{}", identity.peer_slot().file_name())?;
            Ok(true)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RatingConfig> {
    let Some(path) = path else {
        return Ok(RatingConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    RatingConfig::from_json(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "peerladder-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn split_csv_drops_blanks() {
        assert_eq!(split_csv(" a#1, ,b#2,"), vec!["a#1".to_string(), "b#2".to_string()]);
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), RatingConfig::default());
        assert!(load_config(Some(temp_path("absent.json").as_path())).is_err());
    }

    #[test]
    fn partial_config_file_overrides_named_fields() {
        let path = temp_path("config.json");
        std::fs::write(&path, r#"{"season_id":"season-7","max_win":30.0}"#).unwrap();
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.season_id, "season-7");
        assert!((config.max_win - 30.0).abs() < f64::EPSILON);
        assert!((config.max_loss - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fingerprint_writes_both_file_names() {
        let path = temp_path("fingerprint.txt");
        let mut target = OutputTarget::new(Some(path.as_path())).unwrap();
        let command = Command::Fingerprint {
            handle: "host#1".to_string(),
            salt: None,
        };
        assert!(run(&command, &mut target).unwrap());
        target.flush_inner().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("rating-") && lines[0].ends_with(".dat"));
        assert!(lines[1].starts_with("peers-"));
        assert!(!content.contains("host"));
    }

    #[test]
    fn inspect_of_corrupt_file_is_unhealthy() {
        let dir = temp_path("corrupt");
        let config = RatingConfig::default();
        let identity = LocalIdentity::new(PlayerId::new("host#1"), &config.fingerprint_salt);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(identity.rating_slot().file_name()), b"not a rating file").unwrap();

        let mut target = OutputTarget::new(Some(temp_path("inspect.json").as_path())).unwrap();
        let command = Command::Inspect(InspectArgs {
            dir,
            local: "host#1".to_string(),
            config: None,
            json: true,
        });
        assert!(!run(&command, &mut target).unwrap());
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.writer().write_all(b"ok").unwrap();
        target.flush_inner().unwrap();
    }
}

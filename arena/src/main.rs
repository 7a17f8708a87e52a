//! Arena binary entry point

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use arena::services::{AnthropicJudge, FileSubmissionStore, ScriptedJudge};
use arena::traits::JudgeBackend;
use arena::TournamentEngine;
use shared::{ArenaConfig, Tournament, TournamentFormat};

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Run an AI-judged tournament over a directory of text submissions")]
struct Args {
    /// Directory of *.txt submissions, one per participant
    #[arg(long, default_value = "data/submissions")]
    submissions: PathBuf,

    /// Tournament name
    #[arg(long, default_value = "arena")]
    name: String,

    /// Tournament format: round_robin, single_elimination or double_elimination
    #[arg(long, short, default_value = "round_robin")]
    format: TournamentFormat,

    /// Maximum simultaneously in-flight judge calls
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-call judge timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Retries for transient judge failures
    #[arg(long)]
    retries: Option<u32>,

    /// Seed for deterministic bye/seeding order
    #[arg(long)]
    seed: Option<u64>,

    /// Use the deterministic offline judge instead of the Anthropic API
    #[arg(long)]
    offline: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> (ArenaConfig, PathBuf, String, TournamentFormat, bool) {
        let mut config = ArenaConfig::from_env();
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_matches = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.judge_timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        (config, self.submissions, self.name, self.format, self.offline)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let log_level = args.log_level.clone();
    shared::logging::init_tracing_with_level(Some(&log_level));

    let (config, submissions_dir, name, format, offline) = args.into_config();

    let store = FileSubmissionStore::load(&submissions_dir).await?;
    println!(
        "Loaded {} submissions from {}",
        store.len(),
        submissions_dir.display()
    );

    if offline {
        let backend = Arc::new(ScriptedJudge::new());
        run(backend, config, name, format, &store).await
    } else {
        let backend = Arc::new(AnthropicJudge::from_env()?);
        run(backend, config, name, format, &store).await
    }
}

async fn run<B: JudgeBackend + 'static>(
    backend: Arc<B>,
    config: ArenaConfig,
    name: String,
    format: TournamentFormat,
    store: &FileSubmissionStore,
) -> anyhow::Result<()> {
    let engine = TournamentEngine::new(backend, config)?;

    let mut tournament = engine.create_tournament(name, format, store).await?;
    engine.run_to_completion(&mut tournament).await?;

    print_report(&engine, &tournament);
    Ok(())
}

fn print_report<B: JudgeBackend + 'static>(engine: &TournamentEngine<B>, tournament: &Tournament) {
    println!();
    println!("=== {} ({}) ===", tournament.name, tournament.format);
    println!(
        "{:<5} {:<24} {:>6} {:>7} {:>6} {:>8}",
        "Rank", "Participant", "Wins", "Losses", "Ties", "Score"
    );
    for entry in engine.standings(tournament) {
        println!(
            "{:<5} {:<24} {:>6.1} {:>7.1} {:>6} {:>8.2}",
            entry.rank, entry.name, entry.wins, entry.losses, entry.ties, entry.average_score
        );
    }

    if let Some(winner) = tournament.winner.and_then(|id| tournament.participant(id)) {
        println!();
        println!("Winner: {}", winner.name);
    }

    let unresolved = tournament.unresolved();
    if !unresolved.is_empty() {
        println!();
        println!(
            "⚠️  {} match(es) could not be judged and were excluded from scoring:",
            unresolved.len()
        );
        for m in unresolved {
            let names: Vec<&str> = m
                .participants
                .iter()
                .filter_map(|id| tournament.participant(*id).map(|p| p.name.as_str()))
                .collect();
            let reason = m
                .failure
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown failure".to_string());
            println!("  round {}: {}: {}", m.round, names.join(" vs "), reason);
        }
    }
}

//! `simulate` CLI (spec 6): replays a completed journal through the deterministic Simulator
//! and prints a verdict.
//!
//! ```text
//! simulate --journal trades.ndjson --seed 42
//! simulate --journal trades.ndjson --config-hash auto --reference-hashes ref.json
//! ```

use clap::Parser;
use control_simulator::{config::SimulatorConfig, replay, verdict::VerdictResult};
use std::{collections::BTreeMap, path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simulate", about = "Deterministic replay of a control-plane journal")]
struct Args {
    /// Path to the NDJSON journal to replay.
    #[arg(long)]
    journal: PathBuf,

    /// PRNG seed for the run (default 42, spec 6).
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Either the literal content hash to bind the run to, or `auto` to compute one from
    /// `--journal`, `--seed` and the dependency fingerprint.
    #[arg(long, default_value = "auto")]
    config_hash: String,

    /// Optional path to a JSON object of `{event_index: expected_hash}` to diff against.
    #[arg(long)]
    reference_hashes: Option<PathBuf>,

    /// Optional path to write this run's `{event_index: hash}` log to, for use as a future
    /// `--reference-hashes` input.
    #[arg(long)]
    output_hashes: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = if args.config_hash == "auto" {
        SimulatorConfig::auto(&args.journal, args.seed)
    } else {
        SimulatorConfig::new(&args.journal, args.seed, args.config_hash.clone())
    };

    let reference_hashes = match args.reference_hashes.as_ref().map(load_reference_hashes) {
        Some(Ok(hashes)) => Some(hashes),
        Some(Err(err)) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
        None => None,
    };

    let (verdict, hash_log) = match replay::run(&config, reference_hashes.as_ref()) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
    };

    if let Some(path) = &args.output_hashes {
        if let Err(err) = write_hash_log(path, &hash_log) {
            eprintln!("error: failed to write --output-hashes: {err}");
            return ExitCode::from(1);
        }
    }

    println!(
        "verdict={:?} events={}/{} config_hash={} seed={}",
        verdict.result, verdict.events_processed, verdict.events_total, verdict.config_hash, verdict.rng_seed
    );

    if let Some(divergence) = &verdict.divergence {
        println!(
            "divergence at event {}: expected={} actual={} causal_chain={:?}",
            divergence.event_index, divergence.expected_hash, divergence.actual_hash, divergence.causal_chain
        );
    }

    match verdict.result {
        VerdictResult::Pass => ExitCode::from(0),
        VerdictResult::Fail | VerdictResult::Error => ExitCode::from(verdict.exit_code() as u8),
    }
}

fn load_reference_hashes(path: &PathBuf) -> Result<BTreeMap<usize, String>, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("parsing {}: {e}", path.display()))
}

fn write_hash_log(path: &PathBuf, hash_log: &BTreeMap<usize, String>) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(hash_log)?;
    std::fs::write(path, bytes)
}

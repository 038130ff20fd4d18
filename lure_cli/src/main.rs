use lure_core::config::{LogFormat, LureConfig};
use lure_core::corpus::{Corpus, InMemoryCorpus};
use lure_core::harness::Harness;
use lure_core::session::{Session, SessionStats};
use lure_core::targets::{all_harnesses, harness_by_name};

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "lure.toml";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Overrides `[logging] level`; `RUST_LOG` overrides both.
    #[clap(long)]
    log_level: Option<String>,
    /// Overrides `[staging] template`.
    #[clap(long)]
    staging_template: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available harnesses.
    List,
    /// Run saved inputs through a harness once each.
    Run {
        harness: String,
        /// Input files or directories of input files.
        #[clap(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Short in-process mutation loop against a harness.
    Smoke {
        harness: String,
        #[clap(short, long)]
        iterations: Option<u64>,
        #[clap(short, long)]
        seed: Option<u64>,
        /// Seed inputs added to `[corpus] initial-seed-paths`.
        #[clap(long)]
        seeds: Vec<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<LureConfig, anyhow::Error> {
    let mut config = match &cli.config_file {
        Some(path) => LureConfig::load_from_file(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                LureConfig::load_from_file(&default_path)?
            } else {
                LureConfig::default()
            }
        }
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(template) = &cli.staging_template {
        config.staging.template = Some(template.clone());
    }
    Ok(config)
}

fn setup_logging(config: &LureConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }
}

fn find_harness(name: &str) -> Result<Box<dyn Harness>, anyhow::Error> {
    harness_by_name(name).ok_or_else(|| {
        let known: Vec<&str> = all_harnesses().iter().map(|h| h.name()).collect();
        anyhow::anyhow!("Unknown harness '{}'. Known harnesses: {}", name, known.join(", "))
    })
}

fn print_stats(stats: &SessionStats, started: Instant) {
    let elapsed = started.elapsed();
    let per_sec = stats.executions as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "Executions: {}, Exercised: {}, Rejected: {}, Staging unavailable: {}",
        stats.executions, stats.exercised, stats.rejected, stats.staging_unavailable
    );
    println!(
        "Crashes: {} ({} unique), Corpus size: {}, Time: {:.2?} ({:.0} execs/sec)",
        stats.crashes, stats.unique_crashes, stats.corpus_len, elapsed, per_sec
    );
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    setup_logging(&config);

    let ctx = config
        .harness_context()
        .context("Invalid staging configuration")?;
    info!(
        staging_dir = %ctx.staging.dir().display(),
        max_input_len = ctx.max_input_len,
        "configuration loaded"
    );

    match cli.command {
        Command::List => {
            for harness in all_harnesses() {
                println!("{:<16} min input {} bytes", harness.name(), harness.min_len());
            }
        }
        Command::Run { harness, inputs } => {
            let harness = find_harness(&harness)?;
            let mut corpus: InMemoryCorpus<Vec<u8>> = InMemoryCorpus::new();
            let loaded = corpus
                .load_initial_seeds(&inputs)
                .context("Failed to load inputs")?;
            info!(harness = harness.name(), inputs = loaded, "replaying inputs");

            let started = Instant::now();
            let stats = Session::new(harness.as_ref(), ctx)
                .with_crash_dir(&config.corpus.crash_dir)
                .replay(&corpus)?;
            print_stats(&stats, started);
            if stats.unique_crashes > 0 {
                anyhow::bail!(
                    "{} input(s) crashed '{}', saved under {:?}",
                    stats.unique_crashes,
                    harness.name(),
                    config.corpus.crash_dir
                );
            }
        }
        Command::Smoke {
            harness,
            iterations,
            seed,
            seeds,
        } => {
            let harness = find_harness(&harness)?;
            let mut seed_paths = config.corpus.initial_seed_paths.clone().unwrap_or_default();
            seed_paths.extend(seeds);

            let mut corpus: InMemoryCorpus<Vec<u8>> = InMemoryCorpus::new();
            let loaded = corpus
                .load_initial_seeds(&seed_paths)
                .context("Failed to load seed inputs")?;
            let iterations = iterations.unwrap_or(config.runner.max_iterations);
            let seed = seed.unwrap_or(config.runner.seed);
            info!(harness = harness.name(), seeds = loaded, iterations, seed, "starting smoke run");

            let started = Instant::now();
            let stats = Session::new(harness.as_ref(), ctx)
                .with_crash_dir(&config.corpus.crash_dir)
                .smoke(&mut corpus, iterations, seed)?;
            print_stats(&stats, started);
        }
    }
    Ok(())
}

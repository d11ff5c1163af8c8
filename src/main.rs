//! Veldt - Entry Point
//!
//! Headless command-line front end for the pursuit simulation: train the
//! predator, replay single hunts, and inspect or export the learned
//! knowledge.

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

use veldt::core::config::{config, set_config, SimulationConfig};
use veldt::core::error::{Result, VeldtError};
use veldt::core::types::{Outcome, PredatorAction, PreyAction};
use veldt::knowledge::KnowledgeStore;
use veldt::simulation::World;
use veldt::training::{all_spots, CycleOptions, PreyBehavior, Trainer};

/// Predator-prey pursuit simulation with rule-induction learning
#[derive(Parser, Debug)]
#[command(name = "veldt")]
#[command(about = "Train and inspect a rule-learning grid predator")]
struct Cli {
    /// TOML file overriding the built-in simulation defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a training cycle and persist the learned knowledge
    Train {
        /// Number of training episodes
        #[arg(long, default_value_t = 1000)]
        episodes: u64,

        /// Restrict training to one start spot (default: all spots)
        #[arg(long)]
        spot: Option<u8>,

        /// Random seed for deterministic runs
        #[arg(long)]
        seed: Option<u64>,

        /// Exploration probability (default: from config)
        #[arg(long)]
        exploration: Option<f64>,

        /// Persist the store every N episodes
        #[arg(long)]
        save_every: Option<u64>,

        /// Run a generalization pass every N episodes
        #[arg(long)]
        generalize_every: Option<u64>,

        /// Knowledge file path (default: from config)
        #[arg(long)]
        knowledge: Option<PathBuf>,

        /// Also export training results JSON here
        #[arg(long)]
        results: Option<PathBuf>,
    },

    /// Replay one headless hunt using the learned knowledge
    Hunt {
        /// Start spot (default: random)
        #[arg(long)]
        spot: Option<u8>,

        /// Random seed for deterministic runs
        #[arg(long)]
        seed: Option<u64>,

        /// Step cap before the hunt is called off
        #[arg(long, default_value_t = 30)]
        max_steps: u32,

        /// Knowledge file path (default: from config)
        #[arg(long)]
        knowledge: Option<PathBuf>,
    },

    /// Show knowledge statistics and the rule list
    Stats {
        /// Knowledge file path (default: from config)
        #[arg(long)]
        knowledge: Option<PathBuf>,

        /// Only list rules with this outcome
        #[arg(long, value_parser = ["success", "failure"])]
        outcome: Option<String>,
    },

    /// Export the knowledge base as a human-readable text file
    Export {
        /// Knowledge file path (default: from config)
        #[arg(long)]
        knowledge: Option<PathBuf>,

        /// Output text file
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "veldt=info".to_string()),
        )
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        let cfg = SimulationConfig::from_file(path).map_err(VeldtError::InvalidConfig)?;
        if set_config(cfg).is_err() {
            tracing::warn!("configuration was already initialized, override ignored");
        }
    }

    match cli.command {
        Command::Train {
            episodes,
            spot,
            seed,
            exploration,
            save_every,
            generalize_every,
            knowledge,
            results,
        } => train(
            episodes,
            spot,
            seed,
            exploration,
            save_every,
            generalize_every,
            knowledge,
            results,
        ),
        Command::Hunt {
            spot,
            seed,
            max_steps,
            knowledge,
        } => hunt(spot, seed, max_steps, knowledge),
        Command::Stats { knowledge, outcome } => stats(knowledge, outcome),
        Command::Export { knowledge, output } => export(knowledge, output),
    }
}

fn knowledge_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| PathBuf::from(&config().knowledge_path))
}

/// Load existing knowledge, tolerating a missing or broken file
fn open_store(path: &PathBuf, seed: u64) -> KnowledgeStore {
    let mut store = KnowledgeStore::with_seed(PredatorAction::vocabulary(), seed);
    if let Err(e) = store.load(path) {
        eprintln!("Warning: {}", e);
        eprintln!("Starting with an empty knowledge base");
    }
    store
}

#[allow(clippy::too_many_arguments)]
fn train(
    episodes: u64,
    spot: Option<u8>,
    seed: Option<u64>,
    exploration: Option<f64>,
    save_every: Option<u64>,
    generalize_every: Option<u64>,
    knowledge: Option<PathBuf>,
    results: Option<PathBuf>,
) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let path = knowledge_path(knowledge);

    let store = open_store(&path, seed);
    let mut trainer = Trainer::new(store, seed);

    let options = CycleOptions {
        episodes,
        spots: spot.map(|s| vec![s]).unwrap_or_else(all_spots),
        behavior: PreyBehavior::Random,
        exploration: exploration.unwrap_or(config().exploration_probability),
        save_every,
        generalize_every,
        knowledge_path: Some(path),
    };
    trainer.run_cycle(&options)?;

    let stats = trainer.stats();
    println!("=== TRAINING COMPLETE (seed {}) ===", seed);
    println!("Episodes:      {}", stats.total_episodes);
    println!(
        "Successes:     {} ({:.1}%)",
        stats.successes,
        stats.successes as f64 / stats.total_episodes.max(1) as f64 * 100.0
    );
    println!("Average steps: {:.1}", stats.average_steps);
    println!("Rules learned: {}", trainer.store().len());

    if let Some(results_path) = results {
        trainer.export_results(&results_path)?;
        println!("Results written to {}", results_path.display());
    }
    Ok(())
}

fn hunt(
    spot: Option<u8>,
    seed: Option<u64>,
    max_steps: u32,
    knowledge: Option<PathBuf>,
) -> Result<()> {
    use rand::Rng;

    let seed = seed.unwrap_or_else(rand::random);
    let path = knowledge_path(knowledge);

    let mut store = open_store(&path, seed);
    let mut world = World::new(spot, ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)))?;
    let mut prey_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(2));

    println!(
        "=== HUNT === spot {} | seed {} | {} rules",
        world.start_spot(),
        seed,
        store.len()
    );

    let mut outcome = None;
    let mut steps = 0u32;
    while outcome.is_none() && steps < max_steps {
        let state = world.knowledge_state();
        let prey_action = PreyAction::VOLUNTARY[prey_rng.gen_range(0..PreyAction::VOLUNTARY.len())];
        let (predator_action, rule) = store.best_action(&state, 0.0);
        let guided = rule.is_some();

        let (_, result) = world.step(prey_action, predator_action.parse()?);
        outcome = result;
        steps += 1;

        if let Some(record) = world.log().last() {
            println!(
                "[{:2}] prey {:14} | predator {:8} ({}) | dist {:2} | {}{}",
                record.tick,
                record.prey_action.to_string(),
                record.predator_action.to_string(),
                if guided { "learned" } else { "unguided" },
                record.distance,
                if record.predator_hidden { "hidden" } else { "visible" },
                record
                    .flee_reason
                    .map(|r| format!(" | prey fleeing: {}", r))
                    .unwrap_or_default(),
            );
        }
    }

    match outcome {
        Some(Outcome::Success) => println!("\nResult: SUCCESS in {} steps", steps),
        Some(Outcome::Failure) => println!("\nResult: FAILURE after {} steps", steps),
        None => println!("\nResult: called off after {} steps", steps),
    }
    Ok(())
}

fn stats(knowledge: Option<PathBuf>, outcome: Option<String>) -> Result<()> {
    let path = knowledge_path(knowledge);
    let store = open_store(&path, 0);

    let filter = match outcome.as_deref() {
        Some("success") => Some(Outcome::Success),
        Some("failure") => Some(Outcome::Failure),
        _ => None,
    };

    let s = store.statistics();
    println!("=== KNOWLEDGE STATISTICS ===");
    println!("Total rules:   {}", s.total_rules);
    println!("Success rules: {}", s.rules_success);
    println!("Failure rules: {}", s.rules_failure);
    println!("Total queries: {}", s.total_queries);
    if s.total_queries > 0 {
        println!("Hit rate:      {:.1}%", s.hit_rate() * 100.0);
    }

    println!("\n=== RULES ({}) ===", store.len());
    for (i, rule) in store.rules().iter().enumerate() {
        if let Some(wanted) = filter {
            if rule.outcome != wanted {
                continue;
            }
        }
        println!("{:3}. {}", i + 1, rule);
    }
    Ok(())
}

fn export(knowledge: Option<PathBuf>, output: PathBuf) -> Result<()> {
    let path = knowledge_path(knowledge);
    let store = open_store(&path, 0);
    store.export_text(&output)?;
    println!(
        "Exported {} rules to {}",
        store.len(),
        output.display()
    );
    Ok(())
}

//! Automatic training: run pursuit episodes and feed the knowledge store
//!
//! A trainer owns a store and a master RNG. Each episode gets a world
//! seeded from the master stream, so one trainer seed reproduces an entire
//! training run, rule for rule.

use chrono::Utc;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::core::config::{config, SPOT_COUNT};
use crate::core::error::Result;
use crate::core::types::{Outcome, PreyAction, State};
use crate::knowledge::store::KnowledgeStore;
use crate::simulation::world::World;

/// How the prey behaves during training
#[derive(Debug, Clone)]
pub enum PreyBehavior {
    /// Uniformly random voluntary action each step
    Random,
    /// Cycle through a fixed action sequence
    Scripted(Vec<PreyAction>),
}

/// Aggregate counters across a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingStats {
    pub total_episodes: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_steps: u64,
    pub average_steps: f64,
}

/// One finished episode, kept for the results export
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeRecord {
    pub timestamp: String,
    pub start_spot: u8,
    pub outcome: Outcome,
    pub steps: u32,
    pub experiences: usize,
}

/// Parameters for a training cycle
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub episodes: u64,
    /// Start spots to draw from; empty means any spot
    pub spots: Vec<u8>,
    pub behavior: PreyBehavior,
    pub exploration: f64,
    /// Persist the store every N episodes (requires `knowledge_path`)
    pub save_every: Option<u64>,
    /// Run a generalization pass every N episodes
    pub generalize_every: Option<u64>,
    /// Where to persist; None trains in memory only
    pub knowledge_path: Option<PathBuf>,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            episodes: 1000,
            spots: all_spots(),
            behavior: PreyBehavior::Random,
            exploration: config().exploration_probability,
            save_every: None,
            generalize_every: None,
            knowledge_path: None,
        }
    }
}

/// Every valid start spot id
pub fn all_spots() -> Vec<u8> {
    (1..=SPOT_COUNT).collect()
}

/// Drives episodes against the world and folds the results into the store
pub struct Trainer {
    store: KnowledgeStore,
    rng: ChaCha8Rng,
    stats: TrainingStats,
    history: Vec<EpisodeRecord>,
}

impl Trainer {
    pub fn new(store: KnowledgeStore, seed: u64) -> Self {
        Self {
            store,
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: TrainingStats::default(),
            history: Vec::new(),
        }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut KnowledgeStore {
        &mut self.store
    }

    pub fn into_store(self) -> KnowledgeStore {
        self.store
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn history(&self) -> &[EpisodeRecord] {
        &self.history
    }

    fn pick_prey_action(&mut self, behavior: &PreyBehavior, step: u32) -> PreyAction {
        match behavior {
            PreyBehavior::Random => {
                let i = self.rng.gen_range(0..PreyAction::VOLUNTARY.len());
                PreyAction::VOLUNTARY[i]
            }
            PreyBehavior::Scripted(sequence) if !sequence.is_empty() => {
                sequence[step as usize % sequence.len()]
            }
            PreyBehavior::Scripted(_) => PreyAction::Drink,
        }
    }

    /// Run one episode and record every step with the terminal outcome.
    ///
    /// Hitting the step cap counts as a failure.
    pub fn run_episode(
        &mut self,
        spots: &[u8],
        behavior: &PreyBehavior,
        exploration: f64,
    ) -> Result<EpisodeRecord> {
        let spot = if spots.is_empty() {
            None
        } else {
            Some(spots[self.rng.gen_range(0..spots.len())])
        };
        let world_seed = self.rng.gen::<u64>();
        let mut world = World::new(spot, ChaCha8Rng::seed_from_u64(world_seed))?;

        let mut experiences: Vec<(State, String)> = Vec::new();
        let mut outcome = None;
        let mut steps = 0u32;

        while outcome.is_none() && steps < config().max_episode_steps {
            let state = world.knowledge_state();
            let prey_action = self.pick_prey_action(behavior, steps);
            let (predator_action, _) = self.store.best_action(&state, exploration);

            let (_, result) = world.step(prey_action, predator_action.parse()?);
            experiences.push((state, predator_action));
            outcome = result;
            steps += 1;
        }

        let outcome = outcome.unwrap_or(Outcome::Failure);
        for (state, action) in &experiences {
            self.store.record_experience(state, action, outcome);
        }

        self.stats.total_episodes += 1;
        match outcome {
            Outcome::Success => self.stats.successes += 1,
            Outcome::Failure => self.stats.failures += 1,
        }
        self.stats.total_steps += steps as u64;
        self.stats.average_steps = self.stats.total_steps as f64 / self.stats.total_episodes as f64;

        let record = EpisodeRecord {
            timestamp: Utc::now().to_rfc3339(),
            start_spot: world.start_spot(),
            outcome,
            steps,
            experiences: experiences.len(),
        };
        self.history.push(record.clone());
        Ok(record)
    }

    /// Run a full training cycle with periodic save and generalization,
    /// then a final save and generalization pass.
    pub fn run_cycle(&mut self, options: &CycleOptions) -> Result<&TrainingStats> {
        tracing::info!(
            episodes = options.episodes,
            spots = ?options.spots,
            exploration = options.exploration,
            rules = self.store.len(),
            "starting training cycle"
        );

        for i in 0..options.episodes {
            self.run_episode(&options.spots, &options.behavior, options.exploration)?;

            let done = i + 1;
            if let (Some(every), Some(path)) = (options.save_every, &options.knowledge_path) {
                if done % every == 0 {
                    self.store.save(path)?;
                }
            }
            if let Some(every) = options.generalize_every {
                if done % every == 0 {
                    let merges = self.store.generalize();
                    if merges > 0 {
                        tracing::debug!(episode = done, merges, "generalized during training");
                    }
                }
            }
        }

        if let Some(path) = &options.knowledge_path {
            self.store.save(path)?;
        }
        let merges = self.store.generalize();

        tracing::info!(
            episodes = self.stats.total_episodes,
            successes = self.stats.successes,
            average_steps = self.stats.average_steps,
            rules = self.store.len(),
            final_merges = merges,
            "training cycle complete"
        );
        Ok(&self.stats)
    }

    /// Success rate of the learned knowledge at one spot, exploration off
    pub fn evaluate(&mut self, spot: u8, trials: u32, max_steps: u32) -> Result<f64> {
        let mut successes = 0u32;

        for _ in 0..trials {
            let world_seed = self.rng.gen::<u64>();
            let mut world = World::new(Some(spot), ChaCha8Rng::seed_from_u64(world_seed))?;
            let mut outcome = None;
            let mut steps = 0u32;

            while outcome.is_none() && steps < max_steps {
                let state = world.knowledge_state();
                let prey_action = self.pick_prey_action(&PreyBehavior::Random, steps);
                let (predator_action, _) = self.store.best_action(&state, 0.0);
                let (_, result) = world.step(prey_action, predator_action.parse()?);
                outcome = result;
                steps += 1;
            }

            if outcome == Some(Outcome::Success) {
                successes += 1;
            }
        }

        Ok(successes as f64 / trials.max(1) as f64)
    }

    /// Export training results as JSON: run statistics, knowledge
    /// statistics, and the most recent episodes.
    pub fn export_results(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct Results<'a> {
            date: String,
            training_stats: &'a TrainingStats,
            knowledge_stats: &'a crate::knowledge::store::Statistics,
            recent_episodes: &'a [EpisodeRecord],
            total_rules: usize,
        }

        let start = self.history.len().saturating_sub(100);
        let results = Results {
            date: Utc::now().to_rfc3339(),
            training_stats: &self.stats,
            knowledge_stats: self.store.statistics(),
            recent_episodes: &self.history[start..],
            total_rules: self.store.len(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&results)?)?;

        tracing::info!(path = %path.display(), "training results exported");
        Ok(())
    }
}

//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their
//! purpose and how they interact with each other.

use serde::Deserialize;
use std::path::Path;

use crate::core::types::{Direction, GridPos};

/// Number of predator start spots along the ridge row
pub const SPOT_COUNT: u8 = 8;

/// Where the prey starts (the waterhole)
pub const PREY_START: GridPos = GridPos { x: 10, y: 2 };

/// Which way the prey faces while at the waterhole
pub const PREY_FACING: Direction = Direction::North;

/// World position of a predator start spot (ids 1 through [`SPOT_COUNT`])
///
/// Spots sit on a single row north of the waterhole, two cells apart.
pub fn spot_position(spot: u8) -> Option<GridPos> {
    if (1..=SPOT_COUNT).contains(&spot) {
        Some(GridPos::new(2 * spot as i32, 5))
    } else {
        None
    }
}

/// Configuration for the pursuit simulation and training loop
///
/// These values reproduce the tuned hunt pacing; changing them shifts the
/// balance between predator and prey.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    // === VISION ===
    /// Maximum distance at which the prey can spot the predator
    ///
    /// Beyond this range the predator is invisible regardless of cover.
    pub vision_max_distance: i32,

    // === MOVEMENT ===
    /// Cells covered per advance step (dominant axis only)
    pub advance_speed: i32,

    /// Cells covered per step while attacking (Chebyshev-normalized)
    pub attack_speed: i32,

    /// Flight speed ramp, indexed by steps spent fleeing
    ///
    /// The prey accelerates: the last entry repeats once the ramp is
    /// exhausted.
    pub flee_sequence: Vec<i32>,

    // === EPISODE TERMINATION ===
    /// Distance below which the prey bolts even without seeing the predator
    pub min_attack_distance: i32,

    /// Preferred outer range for launching an attack (advisory, used by
    /// hand-authored rules)
    pub max_attack_distance: i32,

    /// A fleeing prey this far from a non-attacking predator has escaped
    pub escape_distance: i32,

    /// Steps an attack may run before the pursuit is called off
    pub attack_time_limit: u64,

    // === TRAINING ===
    /// Probability of taking a random action instead of the learned one
    ///
    /// At 0.3, roughly one step in three explores. Evaluation runs use 0.
    pub exploration_probability: f64,

    /// Step cap per training episode; hitting it counts as a failure
    pub max_episode_steps: u32,

    // === KNOWLEDGE MAINTENANCE ===
    /// Rules observed fewer times than this are pruning candidates
    pub prune_min_count: u32,

    /// Success-rate floor that lets a once-seen rule survive pruning
    pub prune_min_rate: f64,

    // === FILES ===
    /// Default location of the persisted knowledge file
    pub knowledge_path: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vision_max_distance: 20,
            advance_speed: 1,
            attack_speed: 2,
            flee_sequence: vec![1, 1, 2, 3],
            min_attack_distance: 3,
            max_attack_distance: 10,
            escape_distance: 20,
            attack_time_limit: 10,
            exploration_probability: 0.3,
            max_episode_steps: 50,
            prune_min_count: 2,
            prune_min_rate: 0.2,
            knowledge_path: "data/knowledge.json".to_string(),
        }
    }
}

/// Optional overrides loaded from a TOML file; anything omitted keeps its
/// default.
#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    vision_max_distance: Option<i32>,
    advance_speed: Option<i32>,
    attack_speed: Option<i32>,
    flee_sequence: Option<Vec<i32>>,
    min_attack_distance: Option<i32>,
    max_attack_distance: Option<i32>,
    escape_distance: Option<i32>,
    attack_time_limit: Option<u64>,
    exploration_probability: Option<f64>,
    max_episode_steps: Option<u32>,
    prune_min_count: Option<u32>,
    prune_min_rate: Option<f64>,
    knowledge_path: Option<String>,
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults overridden by a TOML file
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    /// Apply a TOML override document to the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let overrides: ConfigOverrides =
            toml::from_str(content).map_err(|e| format!("Invalid TOML: {}", e))?;

        let mut config = Self::default();
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(v) = overrides.$field { config.$field = v; })*
            };
        }
        apply!(
            vision_max_distance,
            advance_speed,
            attack_speed,
            flee_sequence,
            min_attack_distance,
            max_attack_distance,
            escape_distance,
            attack_time_limit,
            exploration_probability,
            max_episode_steps,
            prune_min_count,
            prune_min_rate,
            knowledge_path
        );

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.exploration_probability) {
            return Err(format!(
                "exploration_probability ({}) must be within [0, 1]",
                self.exploration_probability
            ));
        }

        if !(0.0..=1.0).contains(&self.prune_min_rate) {
            return Err(format!(
                "prune_min_rate ({}) must be within [0, 1]",
                self.prune_min_rate
            ));
        }

        if self.min_attack_distance >= self.max_attack_distance {
            return Err(format!(
                "min_attack_distance ({}) should be < max_attack_distance ({})",
                self.min_attack_distance, self.max_attack_distance
            ));
        }

        if self.flee_sequence.is_empty() {
            return Err("flee_sequence must not be empty".into());
        }

        if self.advance_speed <= 0 || self.attack_speed <= 0 {
            return Err("Movement speeds must be positive".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<SimulationConfig> = OnceLock::new();

/// Get the global simulation config (initializes with defaults if not set)
pub fn config() -> &'static SimulationConfig {
    CONFIG.get_or_init(SimulationConfig::default)
}

/// Set the global simulation config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: SimulationConfig) -> Result<(), SimulationConfig> {
    CONFIG.set(config)
}

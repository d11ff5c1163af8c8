//! The pursuit world: grid state, field of view, flight, and stepping
//!
//! The world is the experience generator for the knowledge store. Each
//! `step` applies one prey action and one predator action, resolves
//! movement and flight, and reports the discretized state snapshot plus
//! the terminal outcome once the episode ends. The store never sees world
//! geometry, only the snapshot.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;

use crate::core::config::{config, spot_position, PREY_FACING, PREY_START, SPOT_COUNT};
use crate::core::error::{Result, VeldtError};
use crate::core::types::{
    state_keys, Direction, DistanceBucket, GridPos, Outcome, PredatorAction, PreyAction, State,
    Tick,
};

/// Why the prey bolted on a given step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FleeReason {
    AlreadyFleeing,
    SawPredator,
    PredatorAttacked,
    TooClose,
}

impl fmt::Display for FleeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FleeReason::AlreadyFleeing => "already fleeing",
            FleeReason::SawPredator => "saw the predator",
            FleeReason::PredatorAttacked => "predator attacked",
            FleeReason::TooClose => "predator too close",
        };
        f.write_str(text)
    }
}

/// One resolved step, kept in the world log for headless replay output
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub tick: Tick,
    pub prey_action: PreyAction,
    pub predator_action: PredatorAction,
    pub predator_pos: GridPos,
    pub prey_pos: GridPos,
    pub predator_hidden: bool,
    pub prey_fleeing: bool,
    pub flee_reason: Option<FleeReason>,
    pub distance: i32,
}

/// Full state of one pursuit episode
pub struct World {
    start_spot: u8,
    predator_pos: GridPos,
    prey_pos: GridPos,
    prey_facing: Direction,
    predator_hidden: bool,
    predator_attacking: bool,
    attack_started_at: Option<Tick>,
    prey_fleeing: bool,
    flee_steps: usize,
    flee_direction: Direction,
    current_prey_action: Option<PreyAction>,
    tick: Tick,
    outcome: Option<Outcome>,
    log: Vec<StepRecord>,
    rng: ChaCha8Rng,
}

impl World {
    /// Start an episode at the given spot, or a random one
    pub fn new(start_spot: Option<u8>, mut rng: ChaCha8Rng) -> Result<Self> {
        let start_spot = match start_spot {
            Some(spot) => spot,
            None => rng.gen_range(1..=SPOT_COUNT),
        };
        let predator_pos = spot_position(start_spot).ok_or(VeldtError::InvalidSpot(start_spot))?;

        Ok(Self {
            start_spot,
            predator_pos,
            prey_pos: PREY_START,
            prey_facing: PREY_FACING,
            predator_hidden: false,
            predator_attacking: false,
            attack_started_at: None,
            prey_fleeing: false,
            flee_steps: 0,
            flee_direction: Direction::East,
            current_prey_action: None,
            tick: 0,
            outcome: None,
            log: Vec::new(),
            rng,
        })
    }

    pub fn start_spot(&self) -> u8 {
        self.start_spot
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn predator_pos(&self) -> GridPos {
        self.predator_pos
    }

    pub fn prey_pos(&self) -> GridPos {
        self.prey_pos
    }

    pub fn log(&self) -> &[StepRecord] {
        &self.log
    }

    /// Manhattan distance between predator and prey
    pub fn distance(&self) -> i32 {
        self.predator_pos.distance(&self.prey_pos)
    }

    /// Whether the prey currently has the predator in view.
    ///
    /// A hidden or out-of-range predator is invisible, and a drinking prey
    /// sees nothing. Look-left/right swing a north-facing cone to NW/NE.
    fn prey_sees_predator(&self) -> bool {
        if self.predator_hidden {
            return false;
        }
        if self.distance() > config().vision_max_distance {
            return false;
        }
        if self.current_prey_action == Some(PreyAction::Drink) {
            return false;
        }

        let view = match self.current_prey_action {
            Some(PreyAction::LookLeft) if self.prey_facing == Direction::North => {
                Direction::NorthWest
            }
            Some(PreyAction::LookRight) if self.prey_facing == Direction::North => {
                Direction::NorthEast
            }
            _ => self.prey_facing,
        };

        let dx = self.predator_pos.x - self.prey_pos.x;
        let dy = self.predator_pos.y - self.prey_pos.y;

        match view {
            Direction::North => dy < 0 && dx.abs() <= dy.abs(),
            Direction::South => dy > 0 && dx.abs() <= dy.abs(),
            Direction::East => dx > 0 && dy.abs() <= dx.abs(),
            Direction::West => dx < 0 && dy.abs() <= dx.abs(),
            Direction::NorthEast => dx > 0 && dy < 0,
            Direction::NorthWest => dx < 0 && dy < 0,
            _ => false,
        }
    }

    /// Whether this step's situation sends the prey into flight
    fn flee_trigger(&self, predator_action: PredatorAction) -> Option<FleeReason> {
        if self.prey_fleeing {
            return Some(FleeReason::AlreadyFleeing);
        }
        if self.prey_sees_predator() {
            return Some(FleeReason::SawPredator);
        }
        if predator_action == PredatorAction::Attack {
            return Some(FleeReason::PredatorAttacked);
        }
        if self.distance() < config().min_attack_distance {
            return Some(FleeReason::TooClose);
        }
        None
    }

    fn start_flight(&mut self) {
        self.prey_fleeing = true;
        self.flee_steps = 0;
        self.flee_direction = if self.rng.gen::<bool>() {
            Direction::East
        } else {
            Direction::West
        };
    }

    fn apply_prey_action(&mut self, action: PreyAction) {
        self.current_prey_action = Some(action);
        if action == PreyAction::Flee && !self.prey_fleeing {
            self.start_flight();
        }
    }

    fn apply_predator_action(&mut self, action: PredatorAction) {
        // An attack, once launched, runs to its end
        if self.predator_attacking {
            return;
        }

        match action {
            PredatorAction::Advance => {
                let dx = self.prey_pos.x - self.predator_pos.x;
                let dy = self.prey_pos.y - self.predator_pos.y;
                if dx.abs() > dy.abs() {
                    self.predator_pos.x += config().advance_speed * dx.signum();
                } else {
                    self.predator_pos.y += config().advance_speed * dy.signum();
                }
                self.predator_hidden = false;
            }
            PredatorAction::Hide => {
                self.predator_hidden = true;
            }
            PredatorAction::Attack => {
                self.predator_attacking = true;
                self.attack_started_at = Some(self.tick);
                self.predator_hidden = false;
            }
        }
    }

    fn update_positions(&mut self) {
        if self.predator_attacking {
            let dx = self.prey_pos.x - self.predator_pos.x;
            let dy = self.prey_pos.y - self.predator_pos.y;
            let stride = dx.abs().max(dy.abs());
            if stride > 0 {
                let speed = config().attack_speed as f64;
                self.predator_pos.x += (dx as f64 / stride as f64 * speed).round() as i32;
                self.predator_pos.y += (dy as f64 / stride as f64 * speed).round() as i32;
            }
        }

        if self.prey_fleeing {
            self.flee_steps += 1;
            let ramp = &config().flee_sequence;
            let speed = ramp[(self.flee_steps - 1).min(ramp.len() - 1)];
            let (ox, _) = self.flee_direction.offset();
            self.prey_pos.x += speed * ox;
        }
    }

    fn check_end(&mut self) {
        if self.distance() == 0 {
            self.outcome = Some(Outcome::Success);
            return;
        }

        if self.prey_fleeing
            && !self.predator_attacking
            && self.distance() > config().escape_distance
        {
            self.outcome = Some(Outcome::Failure);
            return;
        }

        if let Some(started) = self.attack_started_at {
            if self.tick - started > config().attack_time_limit {
                self.outcome = Some(Outcome::Failure);
            }
        }
    }

    /// Advance the world one step.
    ///
    /// Returns the discretized state snapshot after the step and the
    /// terminal outcome, or None while the episode continues. Stepping a
    /// finished episode is a no-op returning the existing outcome.
    pub fn step(
        &mut self,
        prey_action: PreyAction,
        predator_action: PredatorAction,
    ) -> (State, Option<Outcome>) {
        if self.outcome.is_some() {
            return (self.knowledge_state(), self.outcome);
        }

        self.tick += 1;

        self.apply_prey_action(prey_action);
        self.apply_predator_action(predator_action);

        let flee_reason = self.flee_trigger(predator_action);
        if flee_reason.is_some() && !self.prey_fleeing {
            self.start_flight();
        }

        self.update_positions();
        self.check_end();

        self.log.push(StepRecord {
            tick: self.tick,
            prey_action,
            predator_action,
            predator_pos: self.predator_pos,
            prey_pos: self.prey_pos,
            predator_hidden: self.predator_hidden,
            prey_fleeing: self.prey_fleeing,
            flee_reason,
            distance: self.distance(),
        });

        (self.knowledge_state(), self.outcome)
    }

    /// The discretized observation consumed by the knowledge store.
    ///
    /// Before the prey has acted the prey-action key is absent; rules
    /// referencing it simply fail to match such a partial state.
    pub fn knowledge_state(&self) -> State {
        let mut state = State::new();
        state.insert(state_keys::POSITION.to_string(), self.start_spot.into());
        state.insert(
            state_keys::DISTANCE.to_string(),
            DistanceBucket::from_distance(self.distance()).as_str().into(),
        );
        if let Some(action) = self.current_prey_action {
            state.insert(state_keys::PREY_ACTION.to_string(), action.as_str().into());
        }
        state.insert(state_keys::HIDDEN.to_string(), self.predator_hidden.into());
        state
    }
}

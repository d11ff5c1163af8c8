//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::VeldtError;

/// Simulation time counter (one step per joint prey/predator action)
pub type Tick = u64;

/// Integer grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell
    pub fn distance(&self, other: &Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Eight-way facing / movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    /// Unit cell offset; north is negative y
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }
}

/// Terminal result of a pursuit episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "failure")]
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions available to the predator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredatorAction {
    #[serde(rename = "advance")]
    Advance,
    #[serde(rename = "hide")]
    Hide,
    #[serde(rename = "attack")]
    Attack,
}

impl PredatorAction {
    pub const ALL: [PredatorAction; 3] = [
        PredatorAction::Advance,
        PredatorAction::Hide,
        PredatorAction::Attack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredatorAction::Advance => "advance",
            PredatorAction::Hide => "hide",
            PredatorAction::Attack => "attack",
        }
    }

    /// The fixed action vocabulary as owned strings, for the knowledge store
    pub fn vocabulary() -> Vec<String> {
        Self::ALL.iter().map(|a| a.as_str().to_string()).collect()
    }
}

impl FromStr for PredatorAction {
    type Err = VeldtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advance" => Ok(PredatorAction::Advance),
            "hide" => Ok(PredatorAction::Hide),
            "attack" => Ok(PredatorAction::Attack),
            other => Err(VeldtError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for PredatorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions available to the prey
///
/// Wire tokens are fixed by recorded knowledge files and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreyAction {
    #[serde(rename = "ver_izquierda")]
    LookLeft,
    #[serde(rename = "ver_derecha")]
    LookRight,
    #[serde(rename = "ver_frente")]
    LookAhead,
    #[serde(rename = "beber")]
    Drink,
    #[serde(rename = "huir")]
    Flee,
}

impl PreyAction {
    pub const ALL: [PreyAction; 5] = [
        PreyAction::LookLeft,
        PreyAction::LookRight,
        PreyAction::LookAhead,
        PreyAction::Drink,
        PreyAction::Flee,
    ];

    /// Actions the prey chooses freely; fleeing is triggered by the world
    pub const VOLUNTARY: [PreyAction; 4] = [
        PreyAction::LookLeft,
        PreyAction::LookRight,
        PreyAction::LookAhead,
        PreyAction::Drink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreyAction::LookLeft => "ver_izquierda",
            PreyAction::LookRight => "ver_derecha",
            PreyAction::LookAhead => "ver_frente",
            PreyAction::Drink => "beber",
            PreyAction::Flee => "huir",
        }
    }
}

impl FromStr for PreyAction {
    type Err = VeldtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ver_izquierda" => Ok(PreyAction::LookLeft),
            "ver_derecha" => Ok(PreyAction::LookRight),
            "ver_frente" => Ok(PreyAction::LookAhead),
            "beber" => Ok(PreyAction::Drink),
            "huir" => Ok(PreyAction::Flee),
            other => Err(VeldtError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for PreyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discretized predator-prey distance, as seen by the knowledge store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceBucket {
    #[serde(rename = "very_close")]
    VeryClose,
    #[serde(rename = "close")]
    Close,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "far")]
    Far,
}

impl DistanceBucket {
    /// Bucket a raw Manhattan distance
    pub fn from_distance(distance: i32) -> Self {
        if distance < 3 {
            DistanceBucket::VeryClose
        } else if distance < 6 {
            DistanceBucket::Close
        } else if distance < 10 {
            DistanceBucket::Medium
        } else {
            DistanceBucket::Far
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceBucket::VeryClose => "very_close",
            DistanceBucket::Close => "close",
            DistanceBucket::Medium => "medium",
            DistanceBucket::Far => "far",
        }
    }
}

impl fmt::Display for DistanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === STATE MODEL ===

/// Attribute keys of the observation schema produced by the world.
///
/// Rules are partial-state predicates: they may reference any subset of
/// these keys, and queries tolerate states shaped differently.
pub mod state_keys {
    /// Predator start spot identifier (integer)
    pub const POSITION: &str = "position";
    /// Discretized distance bucket (string)
    pub const DISTANCE: &str = "distance";
    /// Prey's current action token (string)
    pub const PREY_ACTION: &str = "accion_impala";
    /// Predator concealment flag (bool)
    pub const HIDDEN: &str = "hidden";
}

/// A single attribute value inside a state snapshot
///
/// Untagged so states serialize as plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl StateValue {
    /// Numeric view, for interval conditions
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Int(v) => Some(*v as f64),
            StateValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(v) => write!(f, "{}", v),
            StateValue::Int(v) => write!(f, "{}", v),
            StateValue::Float(v) => write!(f, "{}", v),
            StateValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Int(v)
    }
}

impl From<u8> for StateValue {
    fn from(v: u8) -> Self {
        StateValue::Int(v as i64)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Float(v)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Str(v.to_string())
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Str(v)
    }
}

/// A state snapshot: attribute name to observed value.
///
/// BTreeMap keeps iteration and serialization order deterministic.
pub type State = std::collections::BTreeMap<String, StateValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_distance() {
        let a = GridPos::new(2, 5);
        let b = GridPos::new(10, 2);
        assert_eq!(a.distance(&b), 11);
        assert_eq!(b.distance(&a), 11);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_distance_buckets() {
        assert_eq!(DistanceBucket::from_distance(0), DistanceBucket::VeryClose);
        assert_eq!(DistanceBucket::from_distance(2), DistanceBucket::VeryClose);
        assert_eq!(DistanceBucket::from_distance(3), DistanceBucket::Close);
        assert_eq!(DistanceBucket::from_distance(5), DistanceBucket::Close);
        assert_eq!(DistanceBucket::from_distance(6), DistanceBucket::Medium);
        assert_eq!(DistanceBucket::from_distance(9), DistanceBucket::Medium);
        assert_eq!(DistanceBucket::from_distance(10), DistanceBucket::Far);
        assert_eq!(DistanceBucket::from_distance(50), DistanceBucket::Far);
    }

    #[test]
    fn test_action_tokens_round_trip() {
        for action in PredatorAction::ALL {
            assert_eq!(action.as_str().parse::<PredatorAction>().unwrap(), action);
        }
        for action in PreyAction::ALL {
            assert_eq!(action.as_str().parse::<PreyAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_state_value_serializes_as_scalar() {
        assert_eq!(
            serde_json::to_string(&StateValue::Int(3)).unwrap(),
            "3"
        );
        assert_eq!(
            serde_json::to_string(&StateValue::Str("far".into())).unwrap(),
            "\"far\""
        );
        assert_eq!(
            serde_json::to_string(&StateValue::Bool(false)).unwrap(),
            "false"
        );
    }

    #[test]
    fn test_state_value_numeric_view() {
        assert_eq!(StateValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(StateValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(StateValue::Str("far".into()).as_f64(), None);
        assert_eq!(StateValue::Bool(true).as_f64(), None);
    }
}

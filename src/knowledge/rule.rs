//! Knowledge rules: partial-state predicates with outcome counters
//!
//! A rule says "IF these attributes hold THEN this action led to this
//! outcome", together with how often it was observed and how well it went.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::types::{Outcome, State, StateValue};

/// Observation count a rule needs before its outcome label may flip
const FLIP_MIN_OBSERVATIONS: u32 = 3;
/// Success rate above which a failure-labeled rule flips to success
const FLIP_TO_SUCCESS_RATE: f64 = 0.7;
/// Success rate below which a success-labeled rule flips to failure
const FLIP_TO_FAILURE_RATE: f64 = 0.3;

/// One attribute's acceptable values inside a rule's condition set
///
/// Untagged: serializes as a bare scalar, an array of scalars (value set),
/// or a two-element numeric array (inclusive interval). Arrays always load
/// back as value sets, so an interval degrades to its two endpoints across
/// a save/load round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Exact equality with one value
    Scalar(StateValue),
    /// Membership in a set of discrete values
    Set(Vec<StateValue>),
    /// Closed numeric interval [lo, hi]
    Range(f64, f64),
}

impl Condition {
    /// Whether this condition accepts the given state value
    pub fn accepts(&self, value: &StateValue) -> bool {
        match self {
            Condition::Scalar(expected) => expected == value,
            Condition::Set(values) => values.contains(value),
            Condition::Range(lo, hi) => value
                .as_f64()
                .map_or(false, |v| *lo <= v && v <= *hi),
        }
    }

    /// The discrete values this condition contributes to a set union.
    ///
    /// Intervals have no discrete members and return None.
    fn union_values(&self) -> Option<Vec<StateValue>> {
        match self {
            Condition::Scalar(value) => Some(vec![value.clone()]),
            Condition::Set(values) => Some(values.clone()),
            Condition::Range(_, _) => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Scalar(value) => write!(f, "={}", value),
            Condition::Set(values) => {
                write!(f, " in {{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "}}")
            }
            Condition::Range(lo, hi) => write!(f, " in [{}, {}]", lo, hi),
        }
    }
}

/// A rule's condition set: attribute name to acceptable values
pub type ConditionSet = BTreeMap<String, Condition>;

/// Lift a raw state snapshot into an all-scalar condition set
pub fn conditions_from_state(state: &State) -> ConditionSet {
    state
        .iter()
        .map(|(key, value)| (key.clone(), Condition::Scalar(value.clone())))
        .collect()
}

/// A single unit of learned knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Partial-state predicate this rule applies to
    #[serde(rename = "condition_set")]
    pub conditions: ConditionSet,
    /// Predator action taken
    pub action: String,
    /// Outcome label; may flip as evidence accumulates
    pub outcome: Outcome,
    /// How many experiences fed this rule
    pub observation_count: u32,
    /// Running mean of success contributions, in [0, 1]
    pub success_rate: f64,
    /// RFC 3339 timestamp of the last update
    pub last_updated: String,
}

impl Rule {
    /// Create a rule from its first observed experience
    pub fn new(conditions: ConditionSet, action: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            conditions,
            action: action.into(),
            outcome,
            observation_count: 1,
            success_rate: if outcome.is_success() { 1.0 } else { 0.0 },
            last_updated: Utc::now().to_rfc3339(),
        }
    }

    /// Create a rule directly from a raw state snapshot
    pub fn from_state(state: &State, action: impl Into<String>, outcome: Outcome) -> Self {
        Self::new(conditions_from_state(state), action, outcome)
    }

    /// Whether every condition accepts the corresponding state attribute.
    ///
    /// State keys not referenced by any condition are irrelevant; a missing
    /// referenced key fails the match. An empty condition set matches
    /// everything.
    pub fn matches(&self, state: &State) -> bool {
        self.conditions
            .iter()
            .all(|(key, condition)| state.get(key).map_or(false, |v| condition.accepts(v)))
    }

    /// Fold one more observed outcome into the counters.
    ///
    /// Once at least three observations exist, the outcome label
    /// self-corrects when the running rate crosses the flip thresholds.
    pub fn update(&mut self, outcome: Outcome) {
        self.observation_count += 1;

        let n = self.observation_count as f64;
        let contribution = if outcome.is_success() { 1.0 } else { 0.0 };
        self.success_rate = (self.success_rate * (n - 1.0) + contribution) / n;

        if self.observation_count >= FLIP_MIN_OBSERVATIONS {
            if self.success_rate > FLIP_TO_SUCCESS_RATE && self.outcome == Outcome::Failure {
                self.outcome = Outcome::Success;
            } else if self.success_rate < FLIP_TO_FAILURE_RATE && self.outcome == Outcome::Success {
                self.outcome = Outcome::Failure;
            }
        }

        self.last_updated = Utc::now().to_rfc3339();
    }

    /// Scan-order score used when picking the best rule for a query
    pub fn weight(&self) -> f64 {
        self.success_rate * self.observation_count as f64
    }

    /// Whether this rule and `other` generalize into one rule: same action,
    /// same outcome, and exactly one attribute key whose effective values
    /// differ (a key absent on one side counts as differing). Intervals do
    /// not union into value sets and block the merge.
    pub fn can_merge_with(&self, other: &Rule) -> bool {
        if self.action != other.action || self.outcome != other.outcome {
            return false;
        }

        let keys: BTreeSet<&String> = self
            .conditions
            .keys()
            .chain(other.conditions.keys())
            .collect();

        let mut differences = 0;
        let mut differing_key: Option<&String> = None;

        for key in keys {
            if self.conditions.get(key) != other.conditions.get(key) {
                differences += 1;
                differing_key = Some(key);
            }
        }

        match differing_key {
            Some(key) if differences == 1 => {
                !matches!(self.conditions.get(key), Some(Condition::Range(_, _)))
                    && !matches!(other.conditions.get(key), Some(Condition::Range(_, _)))
            }
            _ => false,
        }
    }

    /// Produce the generalized rule, or None if the pair is not mergeable.
    ///
    /// The differing attribute becomes the union of both sides' value sets;
    /// counts add up and the success rate is their count-weighted average.
    pub fn merge_with(&self, other: &Rule) -> Option<Rule> {
        if !self.can_merge_with(other) {
            return None;
        }

        let keys: BTreeSet<&String> = self
            .conditions
            .keys()
            .chain(other.conditions.keys())
            .collect();

        let mut conditions = self.conditions.clone();
        for key in keys {
            let ours = self.conditions.get(key);
            let theirs = other.conditions.get(key);
            if ours == theirs {
                continue;
            }

            let mut union: Vec<StateValue> = Vec::new();
            for side in [ours, theirs].into_iter().flatten() {
                for value in side.union_values()? {
                    if !union.contains(&value) {
                        union.push(value);
                    }
                }
            }
            conditions.insert(key.clone(), Condition::Set(union));
        }

        let observation_count = self.observation_count + other.observation_count;
        let success_rate = (self.success_rate * self.observation_count as f64
            + other.success_rate * other.observation_count as f64)
            / observation_count as f64;

        Some(Rule {
            conditions,
            action: self.action.clone(),
            outcome: self.outcome,
            observation_count,
            success_rate,
            last_updated: Utc::now().to_rfc3339(),
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF ")?;
        if self.conditions.is_empty() {
            write!(f, "<any state>")?;
        } else {
            for (i, (key, condition)) in self.conditions.iter().enumerate() {
                if i > 0 {
                    write!(f, " AND ")?;
                }
                write!(f, "{}{}", key, condition)?;
            }
        }
        write!(
            f,
            " THEN {} -> {} ({:.1}%, n={})",
            self.action,
            self.outcome,
            self.success_rate * 100.0,
            self.observation_count
        )
    }
}

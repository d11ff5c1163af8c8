//! Rule-based knowledge: learned condition -> action -> outcome rules

pub mod rule;
pub mod store;

pub use rule::{conditions_from_state, Condition, ConditionSet, Rule};
pub use store::{KnowledgeStore, Statistics};

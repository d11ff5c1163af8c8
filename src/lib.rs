//! Veldt - Predator-Prey Pursuit with Rule Induction
//!
//! A predator learns to hunt on a discrete grid by caching the outcomes of
//! its past actions as condition -> action -> outcome rules, generalizing
//! similar rules, and pruning unreliable ones.

pub mod core;
pub mod knowledge;
pub mod simulation;
pub mod training;

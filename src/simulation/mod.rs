pub mod world;

pub use world::{FleeReason, StepRecord, World};

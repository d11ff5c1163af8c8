pub mod trainer;

pub use trainer::{all_spots, CycleOptions, PreyBehavior, Trainer, TrainingStats};

//! Spaced repetition scheduling
//!
//! This module provides:
//! - Per-word memory state (difficulty, stability, lifecycle phase)
//! - An FSRS-style pure scheduling function
//! - Named tuning parameters for retention and interval bounds

pub mod algorithm;
pub mod models;
pub mod params;

pub use algorithm::{elapsed_days, next_interval, retrievability, schedule};
pub use models::{Grade, MemoryState, Phase};
pub use params::SchedulerParams;

//! Tunable constants for the scheduler
//!
//! Every number the scheduling formulas use lives here, so deployments
//! can adjust retention targets and interval bounds without touching
//! the algorithm itself.

use serde::{Deserialize, Serialize};

/// FSRS-4.5 weight vector w0..w16
pub const DEFAULT_WEIGHTS: [f64; 17] = [
    0.4, 0.6, 2.4, 5.8, 4.93, 0.94, 0.86, 0.01, 1.49, 0.14, 0.94, 2.18, 0.05, 0.34, 1.26, 0.29,
    2.61,
];

/// Scheduler tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerParams {
    /// FSRS weight vector
    pub weights: [f64; 17],
    /// Target recall probability when converting stability to an
    /// interval
    pub desired_retention: f64,
    /// Initial stability in days per first-review grade
    /// (Again, Hard, Good, Easy). Higher than stock FSRS on purpose:
    /// the words in these books were taught in class before they show
    /// up here.
    pub first_stability: [f64; 4],
    /// Interval curve factor; 19/81 pairs with a -0.5 decay so that a
    /// 0.9 retention target yields interval == stability
    pub interval_factor: f64,
    /// Interval curve decay exponent
    pub interval_decay: f64,
    /// Interval floor in days for cards past the Learning phase
    pub min_interval_days: i64,
    /// Interval ceiling in days
    pub max_interval_days: i64,
    /// Consecutive grade >= 3 reviews required to graduate
    /// Learning -> Review
    pub graduation_streak: u32,
    /// Post-lapse stability is at most this fraction of the pre-lapse
    /// value
    pub lapse_stability_cap: f64,
    /// Absolute stability floor
    pub min_stability: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            desired_retention: 0.9,
            first_stability: [1.0, 3.0, 7.0, 14.0],
            interval_factor: 19.0 / 81.0,
            interval_decay: -0.5,
            min_interval_days: 1,
            max_interval_days: 60,
            graduation_streak: 2,
            lapse_stability_cap: 0.9,
            min_stability: 0.01,
        }
    }
}

//! Data models for the spaced repetition memory system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review grade on the 1-4 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum Grade {
    /// Failed to recall, or ran out of attempts
    Again = 1,
    /// Recalled on the final attempt
    Hard = 2,
    /// Recalled on the second attempt, or on the first with a hint
    Good = 3,
    /// Recalled on the first attempt unaided
    Easy = 4,
}

impl Grade {
    /// Numeric value on the 1-4 scale
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Parse a numeric grade; `None` for anything outside 1-4
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }
}

/// Phase of a word in the spaced repetition lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Never reviewed
    New,
    /// Seen, but not yet reliably recalled
    Learning,
    /// Regular spaced review
    Review,
    /// Fell out of review, relearning
    Relapse,
}

impl Default for Phase {
    fn default() -> Self {
        Self::New
    }
}

/// Memory state of one word for one user
///
/// Created on first exposure, updated exactly once per completed
/// review, never deleted. Skipped cards leave it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    /// Intrinsic difficulty, 1 (easiest) to 10 (hardest)
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
    /// Memory stability in days: time for recall probability to decay
    /// to 90%
    #[serde(default)]
    pub stability: f64,
    /// Current lifecycle phase
    #[serde(default)]
    pub phase: Phase,
    /// Completed reviews
    #[serde(default)]
    pub reps: u32,
    /// Grade-1 outcomes while the word was in Review or Relapse
    #[serde(default)]
    pub lapses: u32,
    /// Consecutive grade >= 3 reviews; drives Learning -> Review
    /// graduation
    #[serde(default)]
    pub streak: u32,
    /// When the word was last reviewed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    /// When the word is next due
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
}

fn default_difficulty() -> f64 {
    5.0
}

impl MemoryState {
    /// State for a word that has never been reviewed
    pub fn new() -> Self {
        Self {
            difficulty: default_difficulty(),
            stability: 0.0,
            phase: Phase::New,
            reps: 0,
            lapses: 0,
            streak: 0,
            last_review: None,
            due: None,
        }
    }

    /// Check whether the word is due for review at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.due {
            Some(due) => due <= now,
            None => false,
        }
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new()
    }
}

//! Data models for progress storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::Grade;

/// Outcome of one card within a session, as recorded in history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewResult {
    /// Answered correctly within the allowed attempts
    Correct,
    /// All attempts used without a correct answer
    Wrong,
    /// Explicitly skipped
    Skipped,
}

/// Append-only record of one completed card
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub user_id: String,
    pub book_id: String,
    pub word: String,
    /// When the card was completed
    pub time: DateTime<Utc>,
    /// Every string the learner submitted for this card, in order
    pub inputs: Vec<String>,
    pub result: ReviewResult,
    /// Attempts consumed; 0 for skips
    pub attempts: u32,
    /// Grade recorded for the card; skips carry `Again`
    pub grade: Grade,
}

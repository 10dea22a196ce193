//! Data models for dictation sessions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::Card;
use crate::scheduler::Grade;
use crate::store::ReviewResult;

/// How the card queue is selected at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    /// Due cards plus new cards from the whole book
    Book,
    /// Due cards plus new cards from a single unit
    Unit,
    /// Due cards only, no new material
    DueToday,
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Active,
    Ended,
}

/// What happens to the current card when the learner skips it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipPolicy {
    /// Leave the due date untouched; the card comes back through
    /// normal scheduling
    Defer,
    /// Put the card at the back of the current queue
    Requeue,
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self::Defer
    }
}

/// Tunables for session behavior
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Attempts allowed per card before it auto-grades as wrong
    pub max_attempts: u32,
    /// Queue size when the caller does not pass a limit
    pub default_limit: usize,
    /// Hard cap on queue size
    pub max_limit: usize,
    /// Idle time after which a session is lazily ended
    pub idle_ttl: Duration,
    pub skip_policy: SkipPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_limit: 20,
            max_limit: 100,
            idle_ttl: Duration::minutes(30),
            skip_policy: SkipPolicy::default(),
        }
    }
}

/// One queued card
#[derive(Debug, Clone)]
pub struct QueueCard {
    pub card: Card,
    /// True when the word had no memory state at queue build
    pub is_new: bool,
}

/// Per-session counters, reported in the end-of-session summary
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTally {
    pub first_correct: usize,
    pub second_correct: usize,
    pub third_correct: usize,
    pub wrong: usize,
    pub skipped: usize,
    /// Longest run of correct cards
    pub best_streak: usize,
}

/// A live dictation session
///
/// Owned by the manager's registry and only mutated under its lock.
/// `current_index` equals the queue length once every card has been
/// processed.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub book_id: String,
    pub mode: SessionMode,
    pub unit_id: Option<String>,
    pub status: SessionStatus,
    /// Ordered card queue; a requeued skip moves its card to the back
    pub queue: Vec<QueueCard>,
    /// Position of the current card
    pub current_index: usize,
    /// Failed attempts on the current card
    pub attempts: u32,
    /// Inputs submitted for the current card
    pub inputs: Vec<String>,
    /// Whether a hint has been shown for the current card
    pub hint_shown: bool,
    /// Run of correct cards feeding `tally.best_streak`
    pub streak: usize,
    pub tally: SessionTally,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(
        user_id: String,
        book_id: String,
        mode: SessionMode,
        unit_id: Option<String>,
        queue: Vec<QueueCard>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            mode,
            unit_id,
            status: SessionStatus::Active,
            queue,
            current_index: 0,
            attempts: 0,
            inputs: Vec::new(),
            hint_shown: false,
            streak: 0,
            tally: SessionTally::default(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Card currently being dictated
    pub fn current(&self) -> Option<&QueueCard> {
        self.queue.get(self.current_index)
    }

    /// True once every card in the queue has been processed
    pub fn is_complete(&self) -> bool {
        self.current_index >= self.queue.len()
    }

    /// Move to the next card, resetting per-card tracking
    pub(crate) fn advance(&mut self) {
        self.current_index += 1;
        self.reset_card_tracking();
    }

    /// Send the current card to the back of the queue without advancing
    ///
    /// Queue length and membership stay as they were at start; the card
    /// comes up again after the remaining ones.
    pub(crate) fn requeue_current(&mut self) {
        if self.current_index < self.queue.len() {
            let queued = self.queue.remove(self.current_index);
            self.queue.push(queued);
        }
        self.reset_card_tracking();
    }

    fn reset_card_tracking(&mut self) {
        self.attempts = 0;
        self.inputs.clear();
        self.hint_shown = false;
    }

    /// Fold a completed card into the tally
    pub(crate) fn record_result(&mut self, result: ReviewResult, attempts: u32) {
        match result {
            ReviewResult::Correct => {
                match attempts {
                    0 | 1 => self.tally.first_correct += 1,
                    2 => self.tally.second_correct += 1,
                    _ => self.tally.third_correct += 1,
                }
                self.streak += 1;
                self.tally.best_streak = self.tally.best_streak.max(self.streak);
            }
            ReviewResult::Wrong => {
                self.tally.wrong += 1;
                self.streak = 0;
            }
            ReviewResult::Skipped => {
                self.tally.skipped += 1;
                self.streak = 0;
            }
        }
    }
}

/// Snapshot of a session, returned by start and current_card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub mode: SessionMode,
    /// Queue length
    pub total: usize,
    /// Cards completed so far
    pub position: usize,
    /// Queued cards that were due at start
    pub due_count: usize,
    /// Queued cards that were new at start
    pub new_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
}

/// Scheduling outcome attached to a completed card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedReview {
    pub result: ReviewResult,
    pub grade: Grade,
    /// Recall probability right before this review; 0 for new words
    pub retrievability: f64,
    pub interval_days: i64,
    pub due: DateTime<Utc>,
}

/// Outcome of one submit call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub correct: bool,
    pub similarity: f64,
    pub distance: usize,
    /// 0 when no hint is attached
    pub hint_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub remaining_attempts: u32,
    /// Target word, revealed once the card is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<CompletedReview>,
    /// Cards completed so far
    pub position: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_card: Option<Card>,
    pub session_complete: bool,
}

/// Outcome of skipping the current card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipOutcome {
    pub position: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_card: Option<Card>,
    pub session_complete: bool,
}

/// End-of-session report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub mode: SessionMode,
    pub book_id: String,
    pub total: usize,
    pub completed: usize,
    pub tally: SessionTally,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
}

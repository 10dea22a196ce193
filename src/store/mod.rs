//! Progress storage contract
//!
//! The engine persists per-word memory states and an append-only
//! review history through the `ProgressStore` trait. The crate ships
//! an in-memory implementation (`MemoryStore`); the embedding
//! application provides the durable one.

pub mod memory;
pub mod models;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cards::Card;
use crate::scheduler::MemoryState;

pub use memory::MemoryStore;
pub use models::{HistoryEntry, ReviewResult};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Progress store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage contract for per-user review progress
///
/// All calls are synchronous; implementations over async backends are
/// expected to block internally. A write must be visible to every
/// subsequent read.
pub trait ProgressStore: Send + Sync {
    /// Cards with memory state due at `now`, most overdue first
    fn get_due_cards(
        &self,
        user_id: &str,
        book_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Card, MemoryState)>>;

    /// Cards of the book (optionally one unit) with no memory state
    /// yet, in book order, at most `limit`
    fn get_new_cards(
        &self,
        user_id: &str,
        book_id: &str,
        unit_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Card>>;

    /// Memory state for a single word; a fresh New state if absent
    fn load_state(&self, user_id: &str, book_id: &str, word: &str) -> Result<MemoryState>;

    /// Persist the memory state for a single word
    fn save_state(
        &self,
        user_id: &str,
        book_id: &str,
        word: &str,
        state: &MemoryState,
    ) -> Result<()>;

    /// Append one review record; history is append-only
    fn append_history(&self, entry: &HistoryEntry) -> Result<()>;

    /// All (word, state) pairs of a user in a book, for statistics
    fn list_states(&self, user_id: &str, book_id: &str) -> Result<Vec<(String, MemoryState)>>;
}

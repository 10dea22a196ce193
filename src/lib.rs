//! Dictation learning-session engine
//!
//! Drives spaced-repetition dictation practice: an FSRS-style
//! scheduler decides when each word comes back, free-text answers are
//! graded by edit-distance similarity, failed attempts earn
//! progressively revealing hints, and `SessionManager` ties it all
//! together over a pluggable `ProgressStore`.

pub mod cards;
pub mod grading;
pub mod hints;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod store;

pub use cards::{Card, StaticWordBook, WordBook};
pub use grading::{check_answer, derive_grade, AnswerCheck};
pub use hints::{card_hint, hint, Hint};
pub use scheduler::{schedule, Grade, MemoryState, Phase, SchedulerParams};
pub use session::{
    SessionConfig, SessionError, SessionManager, SessionMode, SessionSummary, SkipPolicy,
};
pub use stats::{book_stats, BookStats};
pub use store::{HistoryEntry, MemoryStore, ProgressStore, ReviewResult, StoreError};

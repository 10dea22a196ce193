//! Dictation sessions
//!
//! A session walks the learner through a queue of cards one at a time.
//! Each card gets up to three attempts with progressively revealing
//! hints; the outcome is graded, scheduled and persisted before the
//! queue advances. `SessionManager` holds the live sessions and is the
//! crate's main entry point.

pub mod manager;
pub mod models;

pub use manager::{SessionError, SessionManager};
pub use models::{
    CompletedReview, QueueCard, Session, SessionConfig, SessionMode, SessionStatus,
    SessionSummary, SessionTally, SessionView, SkipOutcome, SkipPolicy, SubmitOutcome,
};

//! Book-level progress statistics
//!
//! Aggregates the stored memory states of one user in one book into
//! phase counts and retention buckets. Retention is the modelled
//! recall probability at the moment of the query, so the buckets shift
//! as time passes even without new reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::{elapsed_days, retrievability, Phase};
use crate::store::{ProgressStore, StoreError};

/// Retention at or above this counts as a strong memory
const STRONG_THRESHOLD: f64 = 0.9;
/// Retention at or above this counts as a medium memory
const MEDIUM_THRESHOLD: f64 = 0.7;

/// Progress counters for one user in one book
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    /// Words with any stored memory state
    pub total: usize,
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub relapse: usize,
    /// Words due for review right now
    pub due_now: usize,
    pub strong: usize,
    pub medium: usize,
    pub weak: usize,
}

/// Compute progress statistics for one user and book at `now`
pub fn book_stats(
    store: &dyn ProgressStore,
    user_id: &str,
    book_id: &str,
    now: DateTime<Utc>,
) -> Result<BookStats, StoreError> {
    let mut stats = BookStats::default();

    for (_word, state) in store.list_states(user_id, book_id)? {
        stats.total += 1;
        match state.phase {
            Phase::New => {
                // Never reviewed: no due date and no meaningful
                // retention
                stats.new += 1;
                continue;
            }
            Phase::Learning => stats.learning += 1,
            Phase::Review => stats.review += 1,
            Phase::Relapse => stats.relapse += 1,
        }

        if state.is_due(now) {
            stats.due_now += 1;
        }

        let retention = retrievability(state.stability, elapsed_days(state.last_review, now));
        if retention >= STRONG_THRESHOLD {
            stats.strong += 1;
        } else if retention >= MEDIUM_THRESHOLD {
            stats.medium += 1;
        } else {
            stats.weak += 1;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::cards::{Card, StaticWordBook};
    use crate::scheduler::MemoryState;
    use crate::store::MemoryStore;

    const USER: &str = "u1";
    const BOOK: &str = "pep7";

    fn state(
        phase: Phase,
        stability: f64,
        reviewed_days_ago: i64,
        due_in_days: i64,
        now: DateTime<Utc>,
    ) -> MemoryState {
        MemoryState {
            difficulty: 5.0,
            stability,
            phase,
            reps: 1,
            lapses: 0,
            streak: 0,
            last_review: Some(now - Duration::days(reviewed_days_ago)),
            due: Some(now + Duration::days(due_in_days)),
        }
    }

    fn test_store() -> MemoryStore {
        let cards = ["apple", "banana", "cat", "dog"]
            .iter()
            .map(|word| Card::new(BOOK.to_string(), word.to_string(), "n. x".to_string()))
            .collect();
        MemoryStore::new(Arc::new(StaticWordBook::new(cards)))
    }

    #[test]
    fn test_empty_book_is_all_zeros() {
        let store = test_store();
        let stats = book_stats(&store, USER, BOOK, Utc::now()).unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.due_now, 0);
    }

    #[test]
    fn test_buckets_by_phase_due_and_retention() {
        let store = test_store();
        let now = Utc::now();

        // Fresh review, retention ~0.97
        let apple = state(Phase::Review, 20.0, 5, 15, now);
        // Overdue, retention 0.81
        let banana = state(Phase::Review, 5.0, 10, -5, now);
        // Long overdue relapse, retention ~0.35
        let cat = state(Phase::Relapse, 1.0, 10, -9, now);
        // Just reviewed, retention ~1.0
        let dog = state(Phase::Learning, 3.0, 0, 3, now);

        store.save_state(USER, BOOK, "apple", &apple).unwrap();
        store.save_state(USER, BOOK, "banana", &banana).unwrap();
        store.save_state(USER, BOOK, "cat", &cat).unwrap();
        store.save_state(USER, BOOK, "dog", &dog).unwrap();

        let stats = book_stats(&store, USER, BOOK, now).unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.new, 0);
        assert_eq!(stats.learning, 1);
        assert_eq!(stats.review, 2);
        assert_eq!(stats.relapse, 1);
        assert_eq!(stats.due_now, 2);
        assert_eq!(stats.strong, 2);
        assert_eq!(stats.medium, 1);
        assert_eq!(stats.weak, 1);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = BookStats {
            total: 3,
            due_now: 2,
            ..BookStats::default()
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["dueNow"], 2);
        assert_eq!(value["total"], 3);
    }
}

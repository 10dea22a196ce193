//! Session lifecycle: queue building, answer submission, skipping and
//! ending

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    CompletedReview, QueueCard, Session, SessionConfig, SessionMode, SessionStatus,
    SessionSummary, SessionView, SkipOutcome, SkipPolicy, SubmitOutcome,
};
use crate::grading::{check_answer, derive_grade, AnswerCheck};
use crate::hints::card_hint;
use crate::scheduler::{elapsed_days, retrievability, schedule, Grade, Phase, SchedulerParams};
use crate::store::{HistoryEntry, ProgressStore, ReviewResult, StoreError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid card: {0}")]
    InvalidCard(String),

    #[error("No cards available to review")]
    EmptyQueue,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session has ended: {0}")]
    SessionEnded(Uuid),

    #[error("Expected attempt {expected}, got {got}")]
    AttemptMismatch { expected: u32, got: u32 },

    #[error("Another submission is in flight for session {0}")]
    ConcurrentSubmit(Uuid),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Owns all live sessions and drives the dictation flow
///
/// Each session sits behind its own mutex; `submit` and `skip` take it
/// with `try_lock` so a second in-flight call on the same session is
/// rejected instead of queued.
pub struct SessionManager {
    store: Arc<dyn ProgressStore>,
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<Session>>>>,
    config: SessionConfig,
    params: SchedulerParams,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self::with_config(store, SessionConfig::default(), SchedulerParams::default())
    }

    pub fn with_config(
        store: Arc<dyn ProgressStore>,
        config: SessionConfig,
        params: SchedulerParams,
    ) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
            config,
            params,
        }
    }

    /// Start a session: due cards first, then new cards up to the limit
    ///
    /// DueToday mode takes no new cards; Unit mode restricts both parts
    /// of the queue to one unit.
    pub fn start(
        &self,
        user_id: &str,
        book_id: &str,
        mode: SessionMode,
        unit_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<SessionView> {
        let now = Utc::now();
        self.sweep_expired(now);
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit);

        let mut queue: Vec<QueueCard> = Vec::new();

        for (card, _state) in self.store.get_due_cards(user_id, book_id, now)? {
            if mode == SessionMode::Unit && card.unit_id.as_deref() != unit_id {
                continue;
            }
            if queue.len() >= limit {
                break;
            }
            queue.push(QueueCard {
                card,
                is_new: false,
            });
        }

        if mode != SessionMode::DueToday && queue.len() < limit {
            let unit = if mode == SessionMode::Unit {
                unit_id
            } else {
                None
            };
            let fresh = self
                .store
                .get_new_cards(user_id, book_id, unit, limit - queue.len())?;
            for card in fresh {
                queue.push(QueueCard { card, is_new: true });
            }
        }

        for queued in &queue {
            if queued.card.word.trim().is_empty() {
                return Err(SessionError::InvalidCard(format!(
                    "blank word in book {}",
                    book_id
                )));
            }
        }

        if queue.is_empty() {
            return Err(SessionError::EmptyQueue);
        }

        let session = Session::new(
            user_id.to_string(),
            book_id.to_string(),
            mode,
            unit_id.map(|u| u.to_string()),
            queue,
            now,
        );
        let id = session.id;
        log::info!(
            "Started session {} for user {} on book {} ({} cards)",
            id,
            user_id,
            book_id,
            session.queue.len()
        );
        let view = Self::view(&session);
        self.sessions
            .lock()
            .unwrap()
            .insert(id, Arc::new(Mutex::new(session)));
        Ok(view)
    }

    /// Submit one answer for the current card
    ///
    /// `attempt` is 1-indexed and must match the session's tracked
    /// count, which guards against duplicate and out-of-order
    /// deliveries from the client.
    pub fn submit(&self, session_id: Uuid, input: &str, attempt: u32) -> Result<SubmitOutcome> {
        let now = Utc::now();
        let session_arc = self.get_session(session_id)?;
        let mut session = session_arc
            .try_lock()
            .map_err(|_| SessionError::ConcurrentSubmit(session_id))?;

        self.ensure_active(&mut session, now)?;

        let queued = match session.current() {
            Some(queued) => queued.clone(),
            None => return Err(SessionError::SessionEnded(session_id)),
        };

        let expected = session.attempts + 1;
        if attempt != expected {
            return Err(SessionError::AttemptMismatch {
                expected,
                got: attempt,
            });
        }
        session.last_activity = now;

        let check = check_answer(&queued.card.word, input);
        log::debug!(
            "Session {} attempt {} on '{}': similarity {:.2}",
            session_id,
            attempt,
            queued.card.word,
            check.similarity
        );

        if check.correct {
            let grade = derive_grade(attempt, session.hint_shown, false);
            let review = self.complete_card(
                &mut session,
                &queued,
                Some(input),
                ReviewResult::Correct,
                grade,
                attempt,
                now,
            )?;
            return Ok(Self::completed_outcome(&session, &queued, &check, review));
        }

        if attempt >= self.config.max_attempts {
            let grade = derive_grade(attempt, session.hint_shown, true);
            let review = self.complete_card(
                &mut session,
                &queued,
                Some(input),
                ReviewResult::Wrong,
                grade,
                attempt,
                now,
            )?;
            return Ok(Self::completed_outcome(&session, &queued, &check, review));
        }

        // Wrong with attempts left: keep the card open and escalate
        // the hint
        session.attempts = attempt;
        session.inputs.push(input.to_string());
        session.hint_shown = true;
        let hint = card_hint(&queued.card, attempt);

        Ok(SubmitOutcome {
            correct: false,
            similarity: check.similarity,
            distance: check.distance,
            hint_level: hint.level,
            hint: Some(hint.text),
            remaining_attempts: self.config.max_attempts - attempt,
            answer: None,
            review: None,
            position: session.current_index,
            total: session.queue.len(),
            next_card: None,
            session_complete: false,
        })
    }

    /// Skip the current card without touching its memory state
    pub fn skip(&self, session_id: Uuid) -> Result<SkipOutcome> {
        let now = Utc::now();
        let session_arc = self.get_session(session_id)?;
        let mut session = session_arc
            .try_lock()
            .map_err(|_| SessionError::ConcurrentSubmit(session_id))?;

        self.ensure_active(&mut session, now)?;

        let queued = match session.current() {
            Some(queued) => queued.clone(),
            None => return Err(SessionError::SessionEnded(session_id)),
        };
        session.last_activity = now;

        let entry = HistoryEntry {
            user_id: session.user_id.clone(),
            book_id: session.book_id.clone(),
            word: queued.card.word.clone(),
            time: now,
            inputs: session.inputs.clone(),
            result: ReviewResult::Skipped,
            attempts: 0,
            grade: Grade::Again,
        };
        self.store.append_history(&entry)?;

        match self.config.skip_policy {
            // The card is not resolved yet, so it stays out of the
            // tally until it comes up again
            SkipPolicy::Requeue => {
                session.streak = 0;
                session.requeue_current();
            }
            SkipPolicy::Defer => {
                session.record_result(ReviewResult::Skipped, 0);
                session.advance();
            }
        }

        Ok(SkipOutcome {
            position: session.current_index,
            total: session.queue.len(),
            next_card: session.current().map(|queued| queued.card.clone()),
            session_complete: session.is_complete(),
        })
    }

    /// End a session and report its summary
    ///
    /// Returns None for unknown or already-ended ids, so double ends
    /// are harmless.
    pub fn end(&self, session_id: Uuid) -> Option<SessionSummary> {
        let session_arc = self.sessions.lock().unwrap().remove(&session_id)?;
        let mut session = session_arc.lock().unwrap();
        session.status = SessionStatus::Ended;

        let now = Utc::now();
        let completed = session.tally.first_correct
            + session.tally.second_correct
            + session.tally.third_correct
            + session.tally.wrong
            + session.tally.skipped;
        let summary = SessionSummary {
            session_id: session.id,
            mode: session.mode,
            book_id: session.book_id.clone(),
            total: session.queue.len(),
            completed,
            tally: session.tally,
            started_at: session.created_at,
            ended_at: now,
            duration_ms: (now - session.created_at).num_milliseconds(),
        };
        log::info!(
            "Ended session {}: {}/{} cards completed",
            session_id,
            completed,
            summary.total
        );
        Some(summary)
    }

    /// Snapshot of a session for a reconnecting client
    pub fn current_card(&self, session_id: Uuid) -> Result<SessionView> {
        let now = Utc::now();
        let session_arc = self.get_session(session_id)?;
        let mut session = session_arc.lock().unwrap();
        self.ensure_active(&mut session, now)?;
        Ok(Self::view(&session))
    }

    // ===== Internals =====

    fn get_session(&self, session_id: Uuid) -> Result<Arc<Mutex<Session>>> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::SessionNotFound(session_id))
    }

    /// Reject ended sessions, lazily expiring idle ones
    fn ensure_active(&self, session: &mut Session, now: DateTime<Utc>) -> Result<()> {
        if session.status == SessionStatus::Ended {
            return Err(SessionError::SessionEnded(session.id));
        }
        if now - session.last_activity > self.config.idle_ttl {
            session.status = SessionStatus::Ended;
            log::info!("Session {} expired after being idle", session.id);
            return Err(SessionError::SessionEnded(session.id));
        }
        Ok(())
    }

    /// Drop registry entries whose sessions sat idle past the TTL
    ///
    /// Sessions caught mid-call hold their own lock and are left alone.
    fn sweep_expired(&self, now: DateTime<Utc>) {
        let mut sessions = self.sessions.lock().unwrap();
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, entry)| match entry.try_lock() {
                Ok(session) => now - session.last_activity > self.config.idle_ttl,
                Err(_) => false,
            })
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            sessions.remove(&id);
            log::info!("Removed idle session {}", id);
        }
    }

    /// Persist a finished card, then fold it into the session
    ///
    /// Store writes happen before the session advances, so a failed
    /// write leaves the card open and the same attempt can be retried.
    #[allow(clippy::too_many_arguments)]
    fn complete_card(
        &self,
        session: &mut Session,
        queued: &QueueCard,
        final_input: Option<&str>,
        result: ReviewResult,
        grade: Grade,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<CompletedReview> {
        let word = &queued.card.word;
        let prior = self
            .store
            .load_state(&session.user_id, &session.book_id, word)?;
        let recall = if prior.phase == Phase::New {
            0.0
        } else {
            retrievability(prior.stability, elapsed_days(prior.last_review, now))
        };

        let next = schedule(&prior, grade, now, &self.params);

        let mut inputs = session.inputs.clone();
        if let Some(input) = final_input {
            inputs.push(input.to_string());
        }
        let entry = HistoryEntry {
            user_id: session.user_id.clone(),
            book_id: session.book_id.clone(),
            word: word.clone(),
            time: now,
            inputs,
            result,
            attempts,
            grade,
        };

        self.store
            .save_state(&session.user_id, &session.book_id, word, &next)?;
        if let Err(err) = self.store.append_history(&entry) {
            log::warn!("Failed to append history for '{}': {}", word, err);
            return Err(err.into());
        }

        session.record_result(result, attempts);
        session.advance();

        Ok(CompletedReview {
            result,
            grade,
            retrievability: recall,
            interval_days: next.due.map(|due| (due - now).num_days()).unwrap_or(0),
            due: next.due.unwrap_or(now),
        })
    }

    fn completed_outcome(
        session: &Session,
        queued: &QueueCard,
        check: &AnswerCheck,
        review: CompletedReview,
    ) -> SubmitOutcome {
        SubmitOutcome {
            correct: check.correct,
            similarity: check.similarity,
            distance: check.distance,
            hint_level: 0,
            hint: None,
            remaining_attempts: 0,
            answer: Some(queued.card.word.clone()),
            review: Some(review),
            position: session.current_index,
            total: session.queue.len(),
            next_card: session.current().map(|queued| queued.card.clone()),
            session_complete: session.is_complete(),
        }
    }

    fn view(session: &Session) -> SessionView {
        let new_count = session.queue.iter().filter(|queued| queued.is_new).count();
        SessionView {
            session_id: session.id,
            status: session.status,
            mode: session.mode,
            total: session.queue.len(),
            position: session.current_index,
            due_count: session.queue.len() - new_count,
            new_count,
            card: session.current().map(|queued| queued.card.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Duration;

    use super::*;
    use crate::cards::{Card, StaticWordBook};
    use crate::scheduler::MemoryState;
    use crate::store::MemoryStore;

    const USER: &str = "u1";
    const BOOK: &str = "pep7";

    fn word(word: &str, translation: &str, unit: &str) -> Card {
        let mut card = Card::new(BOOK.to_string(), word.to_string(), translation.to_string());
        card.unit_id = Some(unit.to_string());
        card
    }

    fn test_book() -> Arc<StaticWordBook> {
        Arc::new(StaticWordBook::new(vec![
            word("apple", "n. 苹果", "unit1"),
            word("banana", "n. 香蕉", "unit1"),
            word("cat", "n. 猫", "unit2"),
            word("dog", "n. 狗", "unit2"),
            word("egg", "n. 鸡蛋", "unit2"),
        ]))
    }

    fn test_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(test_book()))
    }

    /// Seed a word in Review phase, due `days_overdue` days ago
    fn seed_due(store: &MemoryStore, word: &str, days_overdue: i64) {
        let now = Utc::now();
        let state = MemoryState {
            difficulty: 5.0,
            stability: 5.0,
            phase: Phase::Review,
            reps: 3,
            lapses: 0,
            streak: 2,
            last_review: Some(now - Duration::days(days_overdue + 5)),
            due: Some(now - Duration::days(days_overdue)),
        };
        store.save_state(USER, BOOK, word, &state).unwrap();
    }

    fn queue_words(manager: &SessionManager, session_id: Uuid) -> Vec<String> {
        let sessions = manager.sessions.lock().unwrap();
        let session = sessions[&session_id].lock().unwrap();
        session
            .queue
            .iter()
            .map(|queued| queued.card.word.clone())
            .collect()
    }

    #[test]
    fn test_start_queues_due_before_new() {
        let store = test_store();
        seed_due(&store, "cat", 3);
        seed_due(&store, "banana", 2);
        seed_due(&store, "apple", 1);

        let manager = SessionManager::new(store);
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, Some(5))
            .unwrap();

        assert_eq!(view.total, 5);
        assert_eq!(view.due_count, 3);
        assert_eq!(view.new_count, 2);
        assert_eq!(view.card.as_ref().map(|c| c.word.as_str()), Some("cat"));
        // Most overdue first, then new cards in book order
        assert_eq!(
            queue_words(&manager, view.session_id),
            vec!["cat", "banana", "apple", "dog", "egg"]
        );
    }

    #[test]
    fn test_due_today_mode_takes_no_new_cards() {
        let store = test_store();
        seed_due(&store, "cat", 1);

        let manager = SessionManager::new(store);
        let view = manager
            .start(USER, BOOK, SessionMode::DueToday, None, None)
            .unwrap();

        assert_eq!(view.total, 1);
        assert_eq!(view.new_count, 0);
        assert_eq!(queue_words(&manager, view.session_id), vec!["cat"]);
    }

    #[test]
    fn test_unit_mode_filters_both_due_and_new() {
        let store = test_store();
        seed_due(&store, "apple", 2);
        seed_due(&store, "cat", 1);

        let manager = SessionManager::new(store);
        let view = manager
            .start(USER, BOOK, SessionMode::Unit, Some("unit2"), None)
            .unwrap();

        assert_eq!(
            queue_words(&manager, view.session_id),
            vec!["cat", "dog", "egg"]
        );
    }

    #[test]
    fn test_start_with_nothing_due_fails_in_due_today_mode() {
        let manager = SessionManager::new(test_store());
        let err = manager
            .start(USER, BOOK, SessionMode::DueToday, None, None)
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyQueue));
    }

    #[test]
    fn test_start_rejects_blank_words() {
        let book = Arc::new(StaticWordBook::new(vec![word("  ", "n. x", "unit1")]));
        let manager = SessionManager::new(Arc::new(MemoryStore::new(book)));
        let err = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidCard(_)));
    }

    #[test]
    fn test_first_try_correct_grades_easy() {
        let store = test_store();
        let manager = SessionManager::new(store.clone());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        let outcome = manager.submit(view.session_id, " Apple ", 1).unwrap();

        assert!(outcome.correct);
        assert_eq!(outcome.hint_level, 0);
        assert_eq!(outcome.answer.as_deref(), Some("apple"));
        assert_eq!(outcome.position, 1);
        assert!(!outcome.session_complete);
        assert_eq!(
            outcome.next_card.as_ref().map(|c| c.word.as_str()),
            Some("banana")
        );

        let review = outcome.review.unwrap();
        assert_eq!(review.grade, Grade::Easy);
        assert_eq!(review.result, ReviewResult::Correct);
        assert_eq!(review.retrievability, 0.0);
        assert_eq!(review.interval_days, 14);

        let state = store.load_state(USER, BOOK, "apple").unwrap();
        assert!((state.stability - 14.0).abs() < 1e-9);
        assert_eq!(state.phase, Phase::Learning);
        assert_eq!(state.reps, 1);

        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result, ReviewResult::Correct);
        assert_eq!(history[0].attempts, 1);
        assert_eq!(history[0].inputs, vec![" Apple "]);
    }

    #[test]
    fn test_wrong_then_correct_grades_good() {
        let store = test_store();
        let manager = SessionManager::new(store.clone());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        let first = manager.submit(view.session_id, "appel", 1).unwrap();
        assert!(!first.correct);
        assert_eq!(first.hint_level, 1);
        assert_eq!(first.hint.as_deref(), Some("5 letters, n."));
        assert!((first.similarity - 0.6).abs() < 1e-9);
        assert_eq!(first.remaining_attempts, 2);
        assert!(first.review.is_none());
        assert_eq!(first.position, 0);

        let second = manager.submit(view.session_id, "apple", 2).unwrap();
        assert!(second.correct);
        assert_eq!(second.review.unwrap().grade, Grade::Good);

        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].attempts, 2);
        assert_eq!(history[0].inputs, vec!["appel", "apple"]);
    }

    #[test]
    fn test_exhausting_attempts_grades_again_and_reveals_answer() {
        let store = test_store();
        seed_due(&store, "cat", 1);
        let manager = SessionManager::new(store.clone());
        let view = manager
            .start(USER, BOOK, SessionMode::DueToday, None, None)
            .unwrap();

        let first = manager.submit(view.session_id, "dog", 1).unwrap();
        assert_eq!(first.hint.as_deref(), Some("3 letters, n."));

        let second = manager.submit(view.session_id, "can", 2).unwrap();
        assert_eq!(second.hint_level, 2);
        assert_eq!(second.hint.as_deref(), Some("c__"));
        assert_eq!(second.remaining_attempts, 1);

        let third = manager.submit(view.session_id, "cot", 3).unwrap();
        assert!(!third.correct);
        assert_eq!(third.answer.as_deref(), Some("cat"));
        assert!(third.session_complete);

        let review = third.review.unwrap();
        assert_eq!(review.grade, Grade::Again);
        assert_eq!(review.result, ReviewResult::Wrong);

        let state = store.load_state(USER, BOOK, "cat").unwrap();
        assert_eq!(state.phase, Phase::Relapse);
        assert_eq!(state.lapses, 1);
        assert!(state.stability > 0.0 && state.stability < 5.0);

        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result, ReviewResult::Wrong);
        assert_eq!(history[0].attempts, 3);
        assert_eq!(history[0].inputs, vec!["dog", "can", "cot"]);
    }

    #[test]
    fn test_attempt_number_must_match() {
        let manager = SessionManager::new(test_store());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        let err = manager.submit(view.session_id, "apple", 2).unwrap_err();
        assert!(matches!(
            err,
            SessionError::AttemptMismatch {
                expected: 1,
                got: 2
            }
        ));

        manager.submit(view.session_id, "wrong", 1).unwrap();
        let err = manager.submit(view.session_id, "apple", 1).unwrap_err();
        assert!(matches!(
            err,
            SessionError::AttemptMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_unknown_session_id() {
        let manager = SessionManager::new(test_store());
        let id = Uuid::new_v4();
        assert!(matches!(
            manager.submit(id, "apple", 1).unwrap_err(),
            SessionError::SessionNotFound(_)
        ));
        assert!(manager.end(id).is_none());
    }

    #[test]
    fn test_concurrent_submit_is_rejected() {
        let manager = SessionManager::new(test_store());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        let session_arc = {
            let sessions = manager.sessions.lock().unwrap();
            Arc::clone(&sessions[&view.session_id])
        };
        let guard = session_arc.lock().unwrap();

        let err = manager.submit(view.session_id, "apple", 1).unwrap_err();
        assert!(matches!(err, SessionError::ConcurrentSubmit(_)));

        drop(guard);
        assert!(manager.submit(view.session_id, "apple", 1).unwrap().correct);
    }

    /// Store whose next save can be made to fail
    struct FlakyStore {
        inner: MemoryStore,
        fail_next_save: AtomicBool,
    }

    impl ProgressStore for FlakyStore {
        fn get_due_cards(
            &self,
            user_id: &str,
            book_id: &str,
            now: DateTime<Utc>,
        ) -> crate::store::Result<Vec<(Card, MemoryState)>> {
            self.inner.get_due_cards(user_id, book_id, now)
        }

        fn get_new_cards(
            &self,
            user_id: &str,
            book_id: &str,
            unit_id: Option<&str>,
            limit: usize,
        ) -> crate::store::Result<Vec<Card>> {
            self.inner.get_new_cards(user_id, book_id, unit_id, limit)
        }

        fn load_state(
            &self,
            user_id: &str,
            book_id: &str,
            word: &str,
        ) -> crate::store::Result<MemoryState> {
            self.inner.load_state(user_id, book_id, word)
        }

        fn save_state(
            &self,
            user_id: &str,
            book_id: &str,
            word: &str,
            state: &MemoryState,
        ) -> crate::store::Result<()> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected failure".to_string()));
            }
            self.inner.save_state(user_id, book_id, word, state)
        }

        fn append_history(&self, entry: &HistoryEntry) -> crate::store::Result<()> {
            self.inner.append_history(entry)
        }

        fn list_states(
            &self,
            user_id: &str,
            book_id: &str,
        ) -> crate::store::Result<Vec<(String, MemoryState)>> {
            self.inner.list_states(user_id, book_id)
        }
    }

    #[test]
    fn test_failed_save_keeps_the_card_open_for_retry() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(test_book()),
            fail_next_save: AtomicBool::new(false),
        });
        let manager = SessionManager::new(store.clone());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        store.fail_next_save.store(true, Ordering::SeqCst);
        let err = manager.submit(view.session_id, "apple", 1).unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));

        {
            let sessions = manager.sessions.lock().unwrap();
            let session = sessions[&view.session_id].lock().unwrap();
            assert_eq!(session.attempts, 0);
            assert_eq!(session.current_index, 0);
        }

        let outcome = manager.submit(view.session_id, "apple", 1).unwrap();
        assert!(outcome.correct);
        assert_eq!(store.inner.history().len(), 1);
    }

    #[test]
    fn test_idle_session_expires_lazily() {
        let manager = SessionManager::new(test_store());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        {
            let sessions = manager.sessions.lock().unwrap();
            let mut session = sessions[&view.session_id].lock().unwrap();
            session.last_activity = Utc::now() - Duration::hours(1);
        }

        let err = manager.submit(view.session_id, "apple", 1).unwrap_err();
        assert!(matches!(err, SessionError::SessionEnded(_)));

        // An expired session can still be ended for its summary
        assert!(manager.end(view.session_id).is_some());
    }

    #[test]
    fn test_start_sweeps_expired_sessions_from_the_registry() {
        let manager = SessionManager::new(test_store());

        let mut stale = Vec::new();
        for _ in 0..3 {
            let view = manager
                .start(USER, BOOK, SessionMode::Book, None, None)
                .unwrap();
            stale.push(view.session_id);
        }
        {
            let sessions = manager.sessions.lock().unwrap();
            assert_eq!(sessions.len(), 3);
            for id in &stale {
                sessions[id].lock().unwrap().last_activity = Utc::now() - Duration::hours(1);
            }
        }

        let fresh = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        {
            let sessions = manager.sessions.lock().unwrap();
            assert_eq!(sessions.len(), 1);
            assert!(sessions.contains_key(&fresh.session_id));
        }
        assert!(matches!(
            manager.submit(stale[0], "apple", 1).unwrap_err(),
            SessionError::SessionNotFound(_)
        ));
    }

    #[test]
    fn test_skip_leaves_memory_state_untouched() {
        let store = test_store();
        seed_due(&store, "cat", 1);
        let manager = SessionManager::new(store.clone());
        let view = manager
            .start(USER, BOOK, SessionMode::DueToday, None, None)
            .unwrap();

        let before = store.load_state(USER, BOOK, "cat").unwrap();
        let outcome = manager.skip(view.session_id).unwrap();

        assert!(outcome.session_complete);
        assert_eq!(store.load_state(USER, BOOK, "cat").unwrap(), before);

        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result, ReviewResult::Skipped);
        assert_eq!(history[0].attempts, 0);
    }

    fn requeue_manager(store: Arc<MemoryStore>) -> SessionManager {
        SessionManager::with_config(
            store,
            SessionConfig {
                skip_policy: SkipPolicy::Requeue,
                ..SessionConfig::default()
            },
            SchedulerParams::default(),
        )
    }

    #[test]
    fn test_requeue_skip_moves_the_card_to_the_back() {
        let store = test_store();
        seed_due(&store, "apple", 1);
        let manager = requeue_manager(store);
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();
        assert_eq!(view.total, 5);
        assert_eq!(view.due_count, 1);

        let outcome = manager.skip(view.session_id).unwrap();

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.position, 0);
        assert!(!outcome.session_complete);
        assert_eq!(
            outcome.next_card.as_ref().map(|c| c.word.as_str()),
            Some("banana")
        );
        assert_eq!(
            queue_words(&manager, view.session_id),
            vec!["banana", "cat", "dog", "egg", "apple"]
        );

        // A reconnecting client still sees the counts from start
        let current = manager.current_card(view.session_id).unwrap();
        assert_eq!(current.total, 5);
        assert_eq!(current.due_count, 1);
        assert_eq!(current.new_count, 4);
    }

    #[test]
    fn test_requeued_card_counts_once() {
        let manager = requeue_manager(test_store());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        manager.skip(view.session_id).unwrap();
        for word in ["banana", "cat", "dog", "egg", "apple"] {
            let outcome = manager.submit(view.session_id, word, 1).unwrap();
            assert!(outcome.correct);
        }

        let summary = manager.end(view.session_id).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.completed, 5);
        assert_eq!(summary.tally.first_correct, 5);
        assert_eq!(summary.tally.skipped, 0);
        assert_eq!(summary.tally.best_streak, 5);
    }

    #[test]
    fn test_requeue_on_the_last_card_offers_it_again() {
        let store = test_store();
        seed_due(&store, "cat", 1);
        let manager = requeue_manager(store);
        let view = manager
            .start(USER, BOOK, SessionMode::DueToday, None, None)
            .unwrap();
        assert_eq!(view.total, 1);

        let outcome = manager.skip(view.session_id).unwrap();
        assert!(!outcome.session_complete);
        assert_eq!(
            outcome.next_card.as_ref().map(|c| c.word.as_str()),
            Some("cat")
        );

        let outcome = manager.submit(view.session_id, "cat", 1).unwrap();
        assert!(outcome.session_complete);
    }

    #[test]
    fn test_end_reports_the_tally_once() {
        let store = test_store();
        let manager = SessionManager::new(store);
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        manager.submit(view.session_id, "apple", 1).unwrap();
        manager.submit(view.session_id, "x", 1).unwrap();
        manager.submit(view.session_id, "x", 2).unwrap();
        manager.submit(view.session_id, "x", 3).unwrap();
        manager.skip(view.session_id).unwrap();

        let summary = manager.end(view.session_id).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.tally.first_correct, 1);
        assert_eq!(summary.tally.wrong, 1);
        assert_eq!(summary.tally.skipped, 1);
        assert_eq!(summary.tally.best_streak, 1);

        assert!(manager.end(view.session_id).is_none());
    }

    #[test]
    fn test_submit_after_the_last_card_fails() {
        let store = test_store();
        seed_due(&store, "cat", 1);
        let manager = SessionManager::new(store);
        let view = manager
            .start(USER, BOOK, SessionMode::DueToday, None, None)
            .unwrap();

        let outcome = manager.submit(view.session_id, "cat", 1).unwrap();
        assert!(outcome.session_complete);

        let err = manager.submit(view.session_id, "cat", 1).unwrap_err();
        assert!(matches!(err, SessionError::SessionEnded(_)));
    }

    #[test]
    fn test_current_card_reports_progress() {
        let manager = SessionManager::new(test_store());
        let view = manager
            .start(USER, BOOK, SessionMode::Book, None, None)
            .unwrap();

        manager.submit(view.session_id, "apple", 1).unwrap();

        let current = manager.current_card(view.session_id).unwrap();
        assert_eq!(current.position, 1);
        assert_eq!(current.total, 5);
        assert_eq!(current.card.as_ref().map(|c| c.word.as_str()), Some("banana"));
    }
}

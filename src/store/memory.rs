//! In-memory progress store
//!
//! Reference implementation of `ProgressStore` over a `WordBook`.
//! Backs the crate's tests and suits embedders that handle durability
//! elsewhere.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::models::HistoryEntry;
use super::{ProgressStore, Result};
use crate::cards::{Card, WordBook};
use crate::scheduler::{MemoryState, Phase};

/// One state per (user, book, word)
type StateKey = (String, String, String);

fn key(user_id: &str, book_id: &str, word: &str) -> StateKey {
    (user_id.to_string(), book_id.to_string(), word.to_string())
}

/// In-memory `ProgressStore` backed by hash maps
pub struct MemoryStore {
    book: Arc<dyn WordBook>,
    states: Mutex<HashMap<StateKey, MemoryState>>,
    history: Mutex<Vec<HistoryEntry>>,
}

impl MemoryStore {
    pub fn new(book: Arc<dyn WordBook>) -> Self {
        Self {
            book,
            states: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every history entry appended so far, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().unwrap().clone()
    }
}

impl ProgressStore for MemoryStore {
    fn get_due_cards(
        &self,
        user_id: &str,
        book_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Card, MemoryState)>> {
        let states = self.states.lock().unwrap();
        let mut due: Vec<(Card, MemoryState)> = Vec::new();

        for ((uid, bid, word), state) in states.iter() {
            if uid != user_id || bid != book_id {
                continue;
            }
            if state.phase == Phase::New || !state.is_due(now) {
                continue;
            }
            match self.book.resolve_card(book_id, word) {
                Some(card) => due.push((card, state.clone())),
                None => {
                    log::warn!("Word '{}' has progress but is missing from book {}", word, book_id)
                }
            }
        }

        // Most overdue first; ties broken by word so the order is stable
        due.sort_by(|a, b| a.1.due.cmp(&b.1.due).then_with(|| a.0.word.cmp(&b.0.word)));

        Ok(due)
    }

    fn get_new_cards(
        &self,
        user_id: &str,
        book_id: &str,
        unit_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Card>> {
        let states = self.states.lock().unwrap();

        Ok(self
            .book
            .list_cards(book_id, unit_id)
            .into_iter()
            .filter(|card| !states.contains_key(&key(user_id, book_id, &card.word)))
            .take(limit)
            .collect())
    }

    fn load_state(&self, user_id: &str, book_id: &str, word: &str) -> Result<MemoryState> {
        let states = self.states.lock().unwrap();
        Ok(states
            .get(&key(user_id, book_id, word))
            .cloned()
            .unwrap_or_default())
    }

    fn save_state(
        &self,
        user_id: &str,
        book_id: &str,
        word: &str,
        state: &MemoryState,
    ) -> Result<()> {
        let mut states = self.states.lock().unwrap();
        states.insert(key(user_id, book_id, word), state.clone());
        Ok(())
    }

    fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.history.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn list_states(&self, user_id: &str, book_id: &str) -> Result<Vec<(String, MemoryState)>> {
        let states = self.states.lock().unwrap();
        let mut listed: Vec<(String, MemoryState)> = states
            .iter()
            .filter(|((uid, bid, _), _)| uid == user_id && bid == book_id)
            .map(|((_, _, word), state)| (word.clone(), state.clone()))
            .collect();

        listed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(listed)
    }
}

//! Word book access

use super::models::Card;

/// Source of card reference data, consulted at queue-build time
///
/// The embedding application implements this over its word-book files.
/// The engine never mutates book content.
pub trait WordBook: Send + Sync {
    /// Resolve a single word to its card, if the book contains it
    fn resolve_card(&self, book_id: &str, word: &str) -> Option<Card>;

    /// Cards of a book in book order, optionally restricted to one unit
    fn list_cards(&self, book_id: &str, unit_id: Option<&str>) -> Vec<Card>;
}

/// In-memory word book backed by a fixed card list
///
/// Useful for tests and for callers that load their books up front.
pub struct StaticWordBook {
    cards: Vec<Card>,
}

impl StaticWordBook {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

impl WordBook for StaticWordBook {
    fn resolve_card(&self, book_id: &str, word: &str) -> Option<Card> {
        self.cards
            .iter()
            .find(|c| c.book_id == book_id && c.word == word)
            .cloned()
    }

    fn list_cards(&self, book_id: &str, unit_id: Option<&str>) -> Vec<Card> {
        self.cards
            .iter()
            .filter(|c| c.book_id == book_id)
            .filter(|c| unit_id.is_none() || c.unit_id.as_deref() == unit_id)
            .cloned()
            .collect()
    }
}

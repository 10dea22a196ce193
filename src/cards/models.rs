//! Data models for word cards

use serde::{Deserialize, Serialize};

/// A single word resolved from a word book
///
/// Cards are immutable reference data. The engine reads them to drive
/// dictation; authoring and parsing of word books belongs to the
/// embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Word book this card belongs to (e.g. "pep_grade7_down")
    pub book_id: String,
    /// Unit within the book, if the book is unit-structured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    /// The target word the learner has to type
    pub word: String,
    /// Native-language meaning, usually prefixed with a
    /// part-of-speech label ("n. 苹果")
    pub translation: String,
    /// Phonetic transcription, when the book provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
}

impl Card {
    pub fn new(book_id: String, word: String, translation: String) -> Self {
        Self {
            book_id,
            unit_id: None,
            word,
            translation,
            phonetic: None,
        }
    }
}

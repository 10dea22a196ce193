//! Word cards and word book access
//!
//! This module provides:
//! - The card model (word, translation, phonetic, book/unit ids)
//! - The `WordBook` trait the engine resolves cards through
//! - A static in-memory word book for tests and simple embedders

pub mod book;
pub mod models;

pub use book::{StaticWordBook, WordBook};
pub use models::Card;

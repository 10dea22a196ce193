//! Answer grading
//!
//! This module provides:
//! - Similarity checking of typed answers against target words
//! - Review grade derivation from attempt outcomes

pub mod grade;
pub mod similarity;

pub use grade::derive_grade;
pub use similarity::{check_answer, levenshtein, normalize, AnswerCheck};

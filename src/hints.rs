//! Progressive hints for failed attempts
//!
//! Hint levels escalate with each failed attempt on a card:
//! - Level 1: word length, plus a part-of-speech label when the
//!   translation carries one
//! - Level k: the first k-1 characters revealed, the rest masked
//!
//! The reveal is capped one character short of the word, so the full
//! answer is never given away.

use serde::Serialize;

use crate::cards::Card;

/// A hint shown after a failed attempt
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    /// Escalation level, equal to the failed attempt number
    pub level: u32,
    pub text: String,
}

/// Build the hint for a failed attempt on a bare target word
///
/// `attempt_number` is 1-indexed and names the attempt that just
/// failed.
pub fn hint(target: &str, attempt_number: u32) -> Hint {
    let level = attempt_number.max(1);
    let chars: Vec<char> = target.chars().collect();

    let text = if level == 1 {
        length_hint(&chars)
    } else {
        masked_prefix(&chars, (level - 1) as usize)
    };

    Hint { level, text }
}

/// Build the hint for a failed attempt on a card
///
/// Same ladder as [`hint`], but level 1 also carries the
/// part-of-speech label extracted from the translation.
pub fn card_hint(card: &Card, attempt_number: u32) -> Hint {
    let mut hint = hint(&card.word, attempt_number);
    if hint.level == 1 {
        if let Some(pos) = pos_label(&card.translation) {
            hint.text = format!("{}, {}", hint.text, pos);
        }
    }
    hint
}

/// Extract the part-of-speech label from a translation prefix
/// ("v. 学习" => Some("v."))
pub fn pos_label(translation: &str) -> Option<&str> {
    let token = translation.split_whitespace().next()?;
    if token.len() <= 8
        && token.ends_with('.')
        && token
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '.' || c == '&')
    {
        Some(token)
    } else {
        None
    }
}

fn length_hint(chars: &[char]) -> String {
    let letters = chars
        .iter()
        .filter(|c| !matches!(c, ' ' | '-' | '\''))
        .count();
    if letters == 1 {
        "1 letter".to_string()
    } else {
        format!("{} letters", letters)
    }
}

fn masked_prefix(chars: &[char], reveal: usize) -> String {
    // Never reveal the final character
    let reveal = reveal.min(chars.len().saturating_sub(1));
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if i < reveal || matches!(c, ' ' | '-' | '\'') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

//! Grade derivation from attempt outcomes

use crate::scheduler::Grade;

/// Derive the review grade from how a card was answered
///
/// Pure mapping, independent of session state:
/// - exhausted attempts (or a skip) => Again
/// - correct on the first attempt without a hint => Easy
/// - correct on the first attempt with a hint, or on the second => Good
/// - correct any later => Hard
pub fn derive_grade(attempt: u32, hint_used: bool, exhausted: bool) -> Grade {
    if exhausted {
        return Grade::Again;
    }
    match attempt {
        0 | 1 => {
            if hint_used {
                Grade::Good
            } else {
                Grade::Easy
            }
        }
        2 => Grade::Good,
        _ => Grade::Hard,
    }
}

//! FSRS-style scheduling
//!
//! Each completed review maps a (memory state, grade) pair to a new
//! state with updated difficulty, stability, and due date. The
//! functions here are pure: given the same state, grade, time, and
//! parameters they always produce the same result.
//!
//! Grades (1-4):
//! - 1: Again - failed to recall, or ran out of attempts
//! - 2: Hard - recalled on the final attempt
//! - 3: Good - recalled on the second attempt, or first with a hint
//! - 4: Easy - recalled on the first attempt unaided

use chrono::{DateTime, Duration, Utc};

use super::models::{Grade, MemoryState, Phase};
use super::params::SchedulerParams;

/// Recall probability that defines stability: a word reviewed exactly
/// `stability` days ago has a 90% chance of recall
const REFERENCE_RETENTION: f64 = 0.9;

const MIN_DIFFICULTY: f64 = 1.0;
const MAX_DIFFICULTY: f64 = 10.0;

/// Probability of recalling a word `elapsed_days` after its last review
pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    REFERENCE_RETENTION.powf(elapsed_days.max(0.0) / stability)
}

/// Fractional days between the last review and `now`; 0 for words that
/// were never reviewed
pub fn elapsed_days(last_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_review {
        Some(last) => ((now - last).num_seconds() as f64 / 86_400.0).max(0.0),
        None => 0.0,
    }
}

/// Days until recall probability decays to the desired retention,
/// clamped to the configured ceiling
pub fn next_interval(stability: f64, params: &SchedulerParams) -> i64 {
    let raw = stability / params.interval_factor
        * (params.desired_retention.powf(1.0 / params.interval_decay) - 1.0);
    (raw.round() as i64).clamp(0, params.max_interval_days)
}

/// Difficulty after the very first review of a word
fn init_difficulty(grade: Grade, params: &SchedulerParams) -> f64 {
    let w = &params.weights;
    let g = grade.value() as f64;
    (w[4] - (g - 3.0) * w[5]).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Mean-reverting difficulty update for subsequent reviews
fn next_difficulty(difficulty: f64, grade: Grade, params: &SchedulerParams) -> f64 {
    let w = &params.weights;
    let g = grade.value() as f64;
    let updated = difficulty - w[6] * (g - 3.0);
    let reverted = w[7] * init_difficulty(Grade::Good, params) + (1.0 - w[7]) * updated;
    reverted.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Stability growth after a successful recall (grade >= 2)
///
/// Growth is larger for higher grades, shrinks as stability
/// accumulates, and shrinks as difficulty rises.
fn next_recall_stability(
    difficulty: f64,
    stability: f64,
    retrievability: f64,
    grade: Grade,
    params: &SchedulerParams,
) -> f64 {
    let w = &params.weights;
    let hard_penalty = if grade == Grade::Hard { w[15] } else { 1.0 };
    let easy_bonus = if grade == Grade::Easy { w[16] } else { 1.0 };
    let growth = w[8].exp()
        * (11.0 - difficulty)
        * stability.powf(-w[9])
        * ((w[10] * (1.0 - retrievability)).exp() - 1.0);

    stability * (1.0 + growth * hard_penalty * easy_bonus)
}

/// Stability after a failed recall (grade 1)
///
/// The raw forget formula can exceed the pre-lapse stability when
/// retrievability is low, so the result is capped to a fraction of the
/// old value and floored so it never reaches zero.
fn next_forget_stability(
    difficulty: f64,
    stability: f64,
    retrievability: f64,
    params: &SchedulerParams,
) -> f64 {
    let w = &params.weights;
    let raw = w[11]
        * difficulty.powf(-w[12])
        * ((stability + 1.0).powf(w[13]) - 1.0)
        * (w[14] * (1.0 - retrievability)).exp();

    raw.min(stability * params.lapse_stability_cap)
        .max(params.min_stability)
}

/// Apply one completed review to a memory state
///
/// # Arguments
/// * `state` - Memory state before the review
/// * `grade` - Review grade (1-4)
/// * `now` - Review time; elapsed time is measured against
///   `state.last_review`, not against the due date
/// * `params` - Scheduler tuning
///
/// # Returns
/// The state after the review, with `due` set to `now` plus the new
/// interval. The input state is not modified.
pub fn schedule(
    state: &MemoryState,
    grade: Grade,
    now: DateTime<Utc>,
    params: &SchedulerParams,
) -> MemoryState {
    let mut next = state.clone();
    next.reps = state.reps + 1;
    next.last_review = Some(now);

    if state.phase == Phase::New {
        next.difficulty = init_difficulty(grade, params);
        next.stability = params.first_stability[(grade.value() - 1) as usize];
        next.streak = if grade >= Grade::Good { 1 } else { 0 };
        next.phase = if next.streak >= params.graduation_streak {
            Phase::Review
        } else {
            Phase::Learning
        };
    } else {
        // Stored states only ever hold positive stability, but never
        // feed an untrusted value into a power function
        let stability = state.stability.max(params.min_stability);
        let elapsed = elapsed_days(state.last_review, now);
        let r = retrievability(stability, elapsed);

        // Difficulty settles first; both stability formulas read the
        // post-review value
        next.difficulty = next_difficulty(state.difficulty, grade, params);

        if grade == Grade::Again {
            next.stability = next_forget_stability(next.difficulty, stability, r, params);
            next.streak = 0;
            if matches!(state.phase, Phase::Review | Phase::Relapse) {
                next.lapses = state.lapses + 1;
                next.phase = Phase::Relapse;
            } else {
                next.phase = Phase::Learning;
            }
        } else {
            next.stability = next_recall_stability(next.difficulty, stability, r, grade, params);
            next.streak = if grade >= Grade::Good {
                state.streak + 1
            } else {
                0
            };
            next.phase = match state.phase {
                Phase::Learning => {
                    if next.streak >= params.graduation_streak {
                        Phase::Review
                    } else {
                        Phase::Learning
                    }
                }
                Phase::Relapse => {
                    if grade >= Grade::Good {
                        Phase::Review
                    } else {
                        Phase::Relapse
                    }
                }
                _ => Phase::Review,
            };
        }
    }

    let mut interval = next_interval(next.stability, params);
    if next.phase != Phase::Learning {
        // Learning cards may come back the same day; everything else
        // waits at least the configured minimum
        interval = interval.max(params.min_interval_days);
    }
    next.due = Some(now + Duration::days(interval));

    next
}

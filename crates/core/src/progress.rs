use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Enrollment, PathId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("day {day} is outside the path's range 1..={challenge_count}")]
    InvalidDay { day: u32, challenge_count: u32 },

    #[error("unknown path: {path_id}")]
    UnknownPath { path_id: PathId },
}

//
// ─── COMPLETION OUTCOME ────────────────────────────────────────────────────────
//

/// Result of applying a challenge submission to an enrollment.
///
/// `enrollment` is `None` only when the answer was wrong and the user had
/// never started the path; a wrong answer never creates a record.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub enrollment: Option<Enrollment>,
    pub correct: bool,
}

//
// ─── ENROLLMENT ENGINE ─────────────────────────────────────────────────────────
//

/// Applies one challenge submission to a user's enrollment for a path.
///
/// Pure state transition: the caller fetches the current enrollment (if
/// any) beforehand and persists the returned one afterwards. The function
/// never performs I/O and is safe to re-run against a fresh read after a
/// storage conflict.
///
/// Semantics:
///
/// - Answers are compared case-sensitively against the challenge's expected
///   output. A wrong answer changes nothing and creates nothing.
/// - The first correct answer for a path creates the enrollment with that
///   single day recorded (lazy enrollment).
/// - Re-submitting an already-solved day is idempotent for progress and the
///   completion flag; it still refreshes `last_activity_at`.
/// - `completed_at` latches the first time progress covers every challenge
///   and never moves afterwards.
///
/// # Errors
///
/// Returns `ProgressError::InvalidDay` if `day` is outside
/// `1..=challenge_count`; the check runs before the answer comparison, so
/// an out-of-range day is rejected even with a correct answer.
///
/// # Panics
///
/// Panics if `challenge_count == 0`; a path with no challenges is a
/// programming error upstream, not a recoverable condition.
#[allow(clippy::too_many_arguments)]
pub fn apply_completion(
    enrollment: Option<Enrollment>,
    user_id: UserId,
    path_id: &PathId,
    day: u32,
    challenge_count: u32,
    submitted_answer: &str,
    expected_answer: &str,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome, ProgressError> {
    assert!(challenge_count >= 1, "challenge_count must be >= 1");

    if day == 0 || day > challenge_count {
        return Err(ProgressError::InvalidDay {
            day,
            challenge_count,
        });
    }

    if submitted_answer != expected_answer {
        return Ok(CompletionOutcome {
            enrollment,
            correct: false,
        });
    }

    let enrollment = match enrollment {
        None => Enrollment::start(user_id, path_id.clone(), day, challenge_count, now),
        Some(mut existing) => {
            debug_assert_eq!(existing.path_id(), path_id, "enrollment/path mismatch");
            if existing.progress().contains(&day) {
                existing.touch(now);
            } else {
                existing.record_day(day, challenge_count, now);
            }
            existing
        }
    };

    Ok(CompletionOutcome {
        enrollment: Some(enrollment),
        correct: true,
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn ids() -> (UserId, PathId) {
        (UserId::random(), PathId::new("ml-basics").unwrap())
    }

    fn apply(
        enrollment: Option<Enrollment>,
        user: UserId,
        path: &PathId,
        day: u32,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, ProgressError> {
        apply_completion(enrollment, user, path, day, 5, answer, "42", now)
    }

    #[test]
    fn first_correct_answer_creates_enrollment() {
        let (user, path) = ids();
        let now = fixed_now();

        let outcome = apply(None, user, &path, 3, "42", now).unwrap();
        assert!(outcome.correct);

        let enrollment = outcome.enrollment.unwrap();
        assert_eq!(enrollment.progress().iter().copied().collect::<Vec<_>>(), vec![3]);
        assert!((enrollment.completion_percentage() - 20.0).abs() < 1e-9);
        assert_eq!(enrollment.enrolled_at(), now);
        assert!(enrollment.completed_at().is_none());
    }

    #[test]
    fn wrong_answer_creates_nothing() {
        let (user, path) = ids();
        let outcome = apply(None, user, &path, 3, "41", fixed_now()).unwrap();

        assert!(!outcome.correct);
        assert!(outcome.enrollment.is_none());
    }

    #[test]
    fn wrong_answer_leaves_existing_enrollment_untouched() {
        let (user, path) = ids();
        let now = fixed_now();
        let enrollment = apply(None, user, &path, 1, "42", now)
            .unwrap()
            .enrollment
            .unwrap();

        let later = now + Duration::hours(1);
        let outcome = apply(Some(enrollment.clone()), user, &path, 2, "nope", later).unwrap();

        assert!(!outcome.correct);
        assert_eq!(outcome.enrollment.unwrap(), enrollment);
    }

    #[test]
    fn answer_comparison_is_case_sensitive() {
        let (user, path) = ids();
        let outcome =
            apply_completion(None, user, &path, 1, 5, "Hello", "hello", fixed_now()).unwrap();
        assert!(!outcome.correct);
    }

    #[test]
    fn resubmitting_a_solved_day_is_idempotent() {
        let (user, path) = ids();
        let now = fixed_now();
        let enrollment = apply(None, user, &path, 3, "42", now)
            .unwrap()
            .enrollment
            .unwrap();

        let later = now + Duration::hours(2);
        let outcome = apply(Some(enrollment.clone()), user, &path, 3, "42", later).unwrap();
        assert!(outcome.correct);

        let updated = outcome.enrollment.unwrap();
        assert_eq!(updated.progress(), enrollment.progress());
        assert!(
            (updated.completion_percentage() - enrollment.completion_percentage()).abs() < 1e-9
        );
        assert_eq!(updated.completed_at(), enrollment.completed_at());
        assert_eq!(updated.last_activity_at(), later);
    }

    #[test]
    fn out_of_order_days_accumulate() {
        let (user, path) = ids();
        let mut now = fixed_now();
        let mut enrollment = None;

        for day in [3, 1, 4] {
            now += Duration::hours(1);
            enrollment = apply(enrollment, user, &path, day, "42", now)
                .unwrap()
                .enrollment;
        }

        let enrollment = enrollment.unwrap();
        assert_eq!(
            enrollment.progress().iter().copied().collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        assert!((enrollment.completion_percentage() - 60.0).abs() < 1e-9);
        assert!(enrollment.completed_at().is_none());
    }

    #[test]
    fn completing_every_day_latches_completed_at() {
        let (user, path) = ids();
        let mut now = fixed_now();
        let mut enrollment = None;

        for day in 1..=5 {
            now += Duration::hours(1);
            enrollment = apply(enrollment, user, &path, day, "42", now)
                .unwrap()
                .enrollment;
        }

        let enrollment = enrollment.unwrap();
        assert_eq!(enrollment.completed_at(), Some(now));
        assert!((enrollment.completion_percentage() - 100.0).abs() < 1e-9);

        // Re-submitting after completion refreshes activity only.
        let later = now + Duration::days(1);
        let outcome = apply(Some(enrollment.clone()), user, &path, 5, "42", later).unwrap();
        let updated = outcome.enrollment.unwrap();
        assert_eq!(updated.completed_at(), enrollment.completed_at());
        assert_eq!(updated.last_activity_at(), later);
    }

    #[test]
    fn day_outside_range_is_rejected_without_state_change() {
        let (user, path) = ids();
        let now = fixed_now();
        let enrollment = apply(None, user, &path, 1, "42", now)
            .unwrap()
            .enrollment
            .unwrap();

        let err = apply(Some(enrollment.clone()), user, &path, 6, "42", now).unwrap_err();
        assert_eq!(
            err,
            ProgressError::InvalidDay {
                day: 6,
                challenge_count: 5
            }
        );

        let err = apply(None, user, &path, 0, "42", now).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidDay { day: 0, .. }));
    }

    #[test]
    fn invalid_day_wins_over_answer_check() {
        let (user, path) = ids();
        let err = apply(None, user, &path, 9, "wrong anyway", fixed_now()).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidDay { day: 9, .. }));
    }

    #[test]
    fn progress_count_is_monotonic_across_submissions() {
        let (user, path) = ids();
        let mut now = fixed_now();
        let mut enrollment: Option<Enrollment> = None;
        let mut last_count = 0;

        for (day, answer) in [(2, "42"), (2, "42"), (1, "no"), (5, "42"), (2, "42")] {
            now += Duration::minutes(10);
            enrollment = apply(enrollment, user, &path, day, answer, now)
                .unwrap()
                .enrollment;
            let count = enrollment.as_ref().map_or(0, Enrollment::completed_days);
            assert!(count >= last_count);
            last_count = count;
        }

        assert_eq!(last_count, 2);
    }

    #[test]
    fn percentage_always_matches_progress_size() {
        let (user, path) = ids();
        let mut now = fixed_now();
        let mut enrollment: Option<Enrollment> = None;

        for day in [5, 5, 2, 3, 1, 4] {
            now += Duration::minutes(1);
            enrollment = apply(enrollment, user, &path, day, "42", now)
                .unwrap()
                .enrollment;

            let e = enrollment.as_ref().unwrap();
            let expected = (e.progress().len() as f64 / 5.0) * 100.0;
            assert!((e.completion_percentage() - expected).abs() < 1e-9);
        }
    }

    #[test]
    #[should_panic(expected = "challenge_count must be >= 1")]
    fn zero_challenge_count_is_a_programming_error() {
        let (user, path) = ids();
        let _ = apply_completion(None, user, &path, 1, 0, "42", "42", fixed_now());
    }
}

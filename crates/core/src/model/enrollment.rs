use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::ids::{PathId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("progress contains day 0")]
    InvalidProgressDay,

    #[error("progress contains duplicate day {day}")]
    DuplicateProgressDay { day: u32 },

    #[error("completion percentage must be in [0, 100], got {provided}")]
    PercentageOutOfRange { provided: f64 },

    #[error("last_activity_at is before enrolled_at")]
    ActivityBeforeEnrollment,

    #[error("completed_at is before enrolled_at")]
    CompletedBeforeEnrollment,

    #[error("completed_at is set but progress is empty")]
    CompletedWithoutProgress,
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// Durable per-user-per-path progress record.
///
/// Created lazily on the first correct answer for a path; there is no
/// enrollment row for a path the user has never solved a day of. Mutation
/// goes through the progress engine only, which maintains the invariants:
///
/// - `completion_percentage == progress.len() / challenge_count * 100`
/// - `completed_at` is set exactly once, when progress first covers every
///   challenge, and never changes afterwards
/// - `enrolled_at` is immutable; `last_activity_at` refreshes on every
///   correct submission, including re-submissions of already-solved days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    user_id: UserId,
    path_id: PathId,
    progress: BTreeSet<u32>,
    completion_percentage: f64,
    enrolled_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Rehydrates an enrollment from persisted storage, re-validating the
    /// shape invariants the store cannot express.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the progress sequence contains day 0 or
    /// duplicates, the percentage is out of range, or the timestamps are
    /// inconsistent.
    pub fn from_persisted(
        user_id: UserId,
        path_id: PathId,
        progress: Vec<u32>,
        completion_percentage: f64,
        enrolled_at: DateTime<Utc>,
        last_activity_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EnrollmentError> {
        let mut days = BTreeSet::new();
        for day in progress {
            if day == 0 {
                return Err(EnrollmentError::InvalidProgressDay);
            }
            if !days.insert(day) {
                return Err(EnrollmentError::DuplicateProgressDay { day });
            }
        }

        if !completion_percentage.is_finite()
            || !(0.0..=100.0).contains(&completion_percentage)
        {
            return Err(EnrollmentError::PercentageOutOfRange {
                provided: completion_percentage,
            });
        }
        if last_activity_at < enrolled_at {
            return Err(EnrollmentError::ActivityBeforeEnrollment);
        }
        if let Some(completed_at) = completed_at {
            if completed_at < enrolled_at {
                return Err(EnrollmentError::CompletedBeforeEnrollment);
            }
            if days.is_empty() {
                return Err(EnrollmentError::CompletedWithoutProgress);
            }
        }

        Ok(Self {
            user_id,
            path_id,
            progress: days,
            completion_percentage,
            enrolled_at,
            last_activity_at,
            completed_at,
        })
    }

    /// Starts a new enrollment with a single completed day (lazy creation).
    pub(crate) fn start(
        user_id: UserId,
        path_id: PathId,
        day: u32,
        challenge_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut enrollment = Self {
            user_id,
            path_id,
            progress: BTreeSet::new(),
            completion_percentage: 0.0,
            enrolled_at: now,
            last_activity_at: now,
            completed_at: None,
        };
        enrollment.record_day(day, challenge_count, now);
        enrollment
    }

    /// Records a newly completed day and recomputes derived state.
    ///
    /// Inserting an already-recorded day is a no-op for progress and the
    /// completion flag; only `last_activity_at` moves.
    pub(crate) fn record_day(&mut self, day: u32, challenge_count: u32, now: DateTime<Utc>) {
        assert!(challenge_count >= 1, "challenge_count must be >= 1");
        assert!(day >= 1, "day must be >= 1");

        self.progress.insert(day);
        self.completion_percentage = percentage(self.progress.len(), challenge_count);
        self.last_activity_at = now;
        if self.completed_at.is_none() && self.progress.len() >= challenge_count as usize {
            self.completed_at = Some(now);
        }
    }

    /// Refreshes the activity timestamp without touching progress.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    // Accessors
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn path_id(&self) -> &PathId {
        &self.path_id
    }

    /// Completed days, ascending and duplicate-free.
    #[must_use]
    pub fn progress(&self) -> &BTreeSet<u32> {
        &self.progress
    }

    /// Number of distinct completed days.
    #[must_use]
    pub fn completed_days(&self) -> u32 {
        u32::try_from(self.progress.len()).unwrap_or(u32::MAX)
    }

    /// Highest completed day, if any.
    #[must_use]
    pub fn highest_day(&self) -> Option<u32> {
        self.progress.last().copied()
    }

    #[must_use]
    pub fn completion_percentage(&self) -> f64 {
        self.completion_percentage
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Completion percentage for `completed` distinct days out of
/// `challenge_count`.
#[allow(clippy::cast_precision_loss)]
fn percentage(completed: usize, challenge_count: u32) -> f64 {
    (completed as f64 / f64::from(challenge_count)) * 100.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn ids() -> (UserId, PathId) {
        (UserId::random(), PathId::new("ml-basics").unwrap())
    }

    #[test]
    fn start_records_first_day() {
        let (user, path) = ids();
        let now = fixed_now();
        let enrollment = Enrollment::start(user, path, 3, 5, now);

        assert_eq!(enrollment.progress().len(), 1);
        assert!(enrollment.progress().contains(&3));
        assert!((enrollment.completion_percentage() - 20.0).abs() < f64::EPSILON);
        assert_eq!(enrollment.enrolled_at(), now);
        assert_eq!(enrollment.last_activity_at(), now);
        assert!(!enrollment.is_completed());
    }

    #[test]
    fn start_on_single_challenge_path_completes_immediately() {
        let (user, path) = ids();
        let now = fixed_now();
        let enrollment = Enrollment::start(user, path, 1, 1, now);

        assert!(enrollment.is_completed());
        assert_eq!(enrollment.completed_at(), Some(now));
        assert!((enrollment.completion_percentage() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_day_sets_completed_at_once() {
        let (user, path) = ids();
        let now = fixed_now();
        let mut enrollment = Enrollment::start(user, path, 1, 2, now);

        let later = now + chrono::Duration::hours(1);
        enrollment.record_day(2, 2, later);
        assert_eq!(enrollment.completed_at(), Some(later));

        // Re-recording a solved day must not move the completion timestamp.
        let much_later = now + chrono::Duration::days(1);
        enrollment.record_day(2, 2, much_later);
        assert_eq!(enrollment.completed_at(), Some(later));
        assert_eq!(enrollment.last_activity_at(), much_later);
    }

    #[test]
    fn from_persisted_rejects_duplicates() {
        let (user, path) = ids();
        let now = fixed_now();
        let err = Enrollment::from_persisted(user, path, vec![1, 2, 2], 40.0, now, now, None)
            .unwrap_err();
        assert_eq!(err, EnrollmentError::DuplicateProgressDay { day: 2 });
    }

    #[test]
    fn from_persisted_rejects_day_zero() {
        let (user, path) = ids();
        let now = fixed_now();
        let err = Enrollment::from_persisted(user, path, vec![0, 1], 40.0, now, now, None)
            .unwrap_err();
        assert_eq!(err, EnrollmentError::InvalidProgressDay);
    }

    #[test]
    fn from_persisted_rejects_out_of_range_percentage() {
        let (user, path) = ids();
        let now = fixed_now();
        let err = Enrollment::from_persisted(user, path, vec![1], 120.0, now, now, None)
            .unwrap_err();
        assert_eq!(
            err,
            EnrollmentError::PercentageOutOfRange { provided: 120.0 }
        );
    }

    #[test]
    fn from_persisted_rejects_inconsistent_timestamps() {
        let (user, path) = ids();
        let now = fixed_now();
        let earlier = now - chrono::Duration::hours(1);

        let err = Enrollment::from_persisted(
            user,
            path.clone(),
            vec![1],
            20.0,
            now,
            earlier,
            None,
        )
        .unwrap_err();
        assert_eq!(err, EnrollmentError::ActivityBeforeEnrollment);

        let err = Enrollment::from_persisted(user, path, vec![1], 20.0, now, now, Some(earlier))
            .unwrap_err();
        assert_eq!(err, EnrollmentError::CompletedBeforeEnrollment);
    }

    #[test]
    fn from_persisted_rejects_completed_without_progress() {
        let (user, path) = ids();
        let now = fixed_now();
        let err = Enrollment::from_persisted(user, path, vec![], 0.0, now, now, Some(now))
            .unwrap_err();
        assert_eq!(err, EnrollmentError::CompletedWithoutProgress);
    }

    #[test]
    fn highest_day_tracks_maximum() {
        let (user, path) = ids();
        let now = fixed_now();
        let enrollment =
            Enrollment::from_persisted(user, path, vec![4, 1, 2], 60.0, now, now, None).unwrap();
        assert_eq!(enrollment.highest_day(), Some(4));
        assert_eq!(enrollment.completed_days(), 3);
    }
}

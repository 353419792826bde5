use serde_json::json;

use pulse_core::model::{ActivityEvent, Enrollment, PathId, UserId};
use pulse_core::progress::{ProgressError, apply_completion};
use pulse_core::resume::next_day;
use pulse_core::time::Clock;
use storage::repository::{EnrollmentRecord, Storage, StorageError};

use crate::error::ChallengeServiceError;

/// Event kind appended after every persisted completion.
pub const CHALLENGE_COMPLETED_EVENT: &str = "challenge_completed";

/// How many times a lost conditional update is retried against a fresh
/// read before the conflict is surfaced.
const MAX_CONFLICT_RETRIES: u32 = 3;

//
// ─── SUBMISSION RESULT ─────────────────────────────────────────────────────────
//

/// Outcome of one answer submission, ready for the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub correct: bool,
    /// The enrollment after the submission; `None` only for a wrong answer
    /// on a never-started path.
    pub enrollment: Option<Enrollment>,
    /// The day to present next, in `1..=challenge_count`.
    pub next_day: u32,
}

//
// ─── CHALLENGE SERVICE ─────────────────────────────────────────────────────────
//

/// Request-scoped orchestration for challenge submissions.
///
/// Owns the read-apply-persist cycle around the pure progress engine: it
/// fetches the path and current enrollment, applies the completion, and
/// writes the result back through the store's conditional update. On a
/// version conflict it re-fetches and re-applies; the engine is pure, so
/// re-running it against a fresh read is always safe, and a concurrent
/// completion of a different day is unioned rather than lost.
pub struct ChallengeService {
    storage: Storage,
    clock: Clock,
}

impl ChallengeService {
    #[must_use]
    pub fn new(storage: Storage, clock: Clock) -> Self {
        Self { storage, clock }
    }

    /// Applies one answer submission for `(user_id, path_id, day)`.
    ///
    /// Wrong answers persist nothing and append no activity. Correct
    /// answers persist the updated enrollment and append a
    /// `challenge_completed` event.
    ///
    /// # Errors
    ///
    /// - `ProgressError::UnknownPath` if the path is not in the catalog.
    /// - `ProgressError::InvalidDay` if the path declares no such day.
    /// - `StorageError::Conflict` if retries are exhausted.
    /// - Other storage and rehydration errors pass through.
    pub async fn submit_answer(
        &self,
        user_id: UserId,
        path_id: &PathId,
        day: u32,
        answer: &str,
    ) -> Result<SubmissionResult, ChallengeServiceError> {
        let path = self
            .storage
            .paths
            .get_path(path_id)
            .await?
            .ok_or_else(|| ProgressError::UnknownPath {
                path_id: path_id.clone(),
            })?;
        let challenge_count = path.challenge_count();
        let expected = path
            .challenge_for_day(day)
            .ok_or(ProgressError::InvalidDay {
                day,
                challenge_count,
            })?
            .expected_output()
            .to_owned();

        let mut attempts = 0;
        loop {
            let stored = self
                .storage
                .enrollments
                .get_enrollment(user_id, path_id)
                .await?;
            let (current, version) = match stored {
                Some(record) => {
                    let version = record.version;
                    (Some(record.into_enrollment()?), version)
                }
                None => (None, 0),
            };

            let now = self.clock.now();
            let outcome = apply_completion(
                current,
                user_id,
                path_id,
                day,
                challenge_count,
                answer,
                &expected,
                now,
            )?;

            if !outcome.correct {
                let next_day = next_day(outcome.enrollment.as_ref(), challenge_count);
                return Ok(SubmissionResult {
                    correct: false,
                    enrollment: outcome.enrollment,
                    next_day,
                });
            }

            let enrollment = outcome
                .enrollment
                .expect("a correct submission always yields an enrollment");
            let record = EnrollmentRecord::from_enrollment(&enrollment, version);

            match self.storage.enrollments.put_enrollment(&record).await {
                Ok(_) => {
                    let event = ActivityEvent::new(
                        user_id,
                        CHALLENGE_COMPLETED_EVENT,
                        now,
                        json!({ "path_id": path_id.as_str(), "day": day }),
                    );
                    self.storage.activity.append_event(&event).await?;

                    let next_day = next_day(Some(&enrollment), challenge_count);
                    return Ok(SubmissionResult {
                        correct: true,
                        enrollment: Some(enrollment),
                        next_day,
                    });
                }
                Err(StorageError::Conflict) if attempts < MAX_CONFLICT_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

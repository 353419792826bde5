use std::sync::{Arc, Mutex};

use pulse_core::model::{Challenge, Path, PathId, UserId};
use pulse_core::progress::ProgressError;
use pulse_core::time::{fixed_clock, fixed_now};
use services::{CHALLENGE_COMPLETED_EVENT, ChallengeService, ChallengeServiceError, Clock};
use storage::repository::{
    ActivityRepository, EnrollmentRecord, EnrollmentRepository, InMemoryRepository, Storage,
    StorageError,
};

fn build_path(id: &str) -> Path {
    Path::new(
        PathId::new(id).unwrap(),
        format!("Path {id}"),
        None,
        vec![],
        (1..=5)
            .map(|day| Challenge::new(day, format!("task {day}"), format!("answer {day}")).unwrap())
            .collect(),
    )
    .unwrap()
}

async fn storage_with_catalog() -> (Storage, InMemoryRepository) {
    let repo = InMemoryRepository::new();
    let storage = Storage {
        enrollments: Arc::new(repo.clone()),
        activity: Arc::new(repo.clone()),
        paths: Arc::new(repo.clone()),
    };
    storage.paths.upsert_path(&build_path("ml-basics")).await.unwrap();
    (storage, repo)
}

#[tokio::test]
async fn first_correct_answer_enrolls_and_advances() {
    let (storage, repo) = storage_with_catalog().await;
    let service = ChallengeService::new(storage, fixed_clock());
    let user = UserId::random();
    let path_id = PathId::new("ml-basics").unwrap();

    let result = service
        .submit_answer(user, &path_id, 3, "answer 3")
        .await
        .unwrap();

    assert!(result.correct);
    assert_eq!(result.next_day, 4);
    let enrollment = result.enrollment.unwrap();
    assert!((enrollment.completion_percentage() - 20.0).abs() < 1e-9);

    let stored = repo.get_enrollment(user, &path_id).await.unwrap().unwrap();
    assert_eq!(stored.progress, vec![3]);
    assert_eq!(stored.version, 1);

    let events = repo
        .list_events(user, fixed_now() - chrono::Duration::days(1))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), CHALLENGE_COMPLETED_EVENT);
    assert_eq!(events[0].data()["day"], 3);
}

#[tokio::test]
async fn wrong_answer_persists_nothing() {
    let (storage, repo) = storage_with_catalog().await;
    let service = ChallengeService::new(storage, fixed_clock());
    let user = UserId::random();
    let path_id = PathId::new("ml-basics").unwrap();

    let result = service
        .submit_answer(user, &path_id, 3, "answer 4")
        .await
        .unwrap();

    assert!(!result.correct);
    assert!(result.enrollment.is_none());
    assert_eq!(result.next_day, 1);
    assert!(repo.get_enrollment(user, &path_id).await.unwrap().is_none());
    assert!(
        repo.list_events(user, fixed_now() - chrono::Duration::days(1))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn completing_all_days_latches_and_resubmission_is_idempotent() {
    let (storage, repo) = storage_with_catalog().await;
    let user = UserId::random();
    let path_id = PathId::new("ml-basics").unwrap();

    let mut clock = fixed_clock();
    for day in 1..=5 {
        clock.advance(chrono::Duration::hours(1));
        let service = ChallengeService::new(storage.clone(), clock);
        let result = service
            .submit_answer(user, &path_id, day, &format!("answer {day}"))
            .await
            .unwrap();
        assert!(result.correct);
    }

    let completed = repo
        .get_enrollment(user, &path_id)
        .await
        .unwrap()
        .unwrap()
        .into_enrollment()
        .unwrap();
    assert!(completed.is_completed());
    let completed_at = completed.completed_at().unwrap();

    clock.advance(chrono::Duration::days(1));
    let service = ChallengeService::new(storage, clock);
    let result = service
        .submit_answer(user, &path_id, 5, "answer 5")
        .await
        .unwrap();

    assert!(result.correct);
    assert_eq!(result.next_day, 5);
    let enrollment = result.enrollment.unwrap();
    assert_eq!(enrollment.completed_at(), Some(completed_at));
    assert_eq!(enrollment.completed_days(), 5);
    assert_eq!(enrollment.last_activity_at(), clock.now());
}

#[tokio::test]
async fn undeclared_day_is_invalid_without_state_change() {
    let (storage, repo) = storage_with_catalog().await;
    let service = ChallengeService::new(storage, fixed_clock());
    let user = UserId::random();
    let path_id = PathId::new("ml-basics").unwrap();

    let err = service
        .submit_answer(user, &path_id, 6, "anything")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ChallengeServiceError::Progress(ProgressError::InvalidDay {
            day: 6,
            challenge_count: 5
        })
    ));
    assert!(repo.get_enrollment(user, &path_id).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_path_is_reported() {
    let (storage, _repo) = storage_with_catalog().await;
    let service = ChallengeService::new(storage, fixed_clock());

    let err = service
        .submit_answer(
            UserId::random(),
            &PathId::new("no-such-path").unwrap(),
            1,
            "x",
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ChallengeServiceError::Progress(ProgressError::UnknownPath { .. })
    ));
}

//
// ─── CONFLICT RETRY ────────────────────────────────────────────────────────────
//

/// Enrollment repository that loses the conditional update a configured
/// number of times before delegating to the in-memory store.
#[derive(Clone)]
struct FlakyEnrollments {
    inner: InMemoryRepository,
    conflicts_remaining: Arc<Mutex<u32>>,
}

#[async_trait::async_trait]
impl EnrollmentRepository for FlakyEnrollments {
    async fn get_enrollment(
        &self,
        user_id: UserId,
        path_id: &PathId,
    ) -> Result<Option<EnrollmentRecord>, StorageError> {
        self.inner.get_enrollment(user_id, path_id).await
    }

    async fn put_enrollment(&self, record: &EnrollmentRecord) -> Result<i64, StorageError> {
        {
            let mut remaining = self.conflicts_remaining.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::Conflict);
            }
        }
        self.inner.put_enrollment(record).await
    }

    async fn list_enrollments(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError> {
        self.inner.list_enrollments(user_id).await
    }
}

async fn flaky_storage(conflicts: u32) -> (Storage, InMemoryRepository) {
    let repo = InMemoryRepository::new();
    let storage = Storage {
        enrollments: Arc::new(FlakyEnrollments {
            inner: repo.clone(),
            conflicts_remaining: Arc::new(Mutex::new(conflicts)),
        }),
        activity: Arc::new(repo.clone()),
        paths: Arc::new(repo.clone()),
    };
    storage.paths.upsert_path(&build_path("ml-basics")).await.unwrap();
    (storage, repo)
}

#[tokio::test]
async fn lost_conditional_update_is_retried() {
    let (storage, repo) = flaky_storage(2).await;
    let service = ChallengeService::new(storage, fixed_clock());
    let user = UserId::random();
    let path_id = PathId::new("ml-basics").unwrap();

    let result = service
        .submit_answer(user, &path_id, 1, "answer 1")
        .await
        .unwrap();

    assert!(result.correct);
    let stored = repo.get_enrollment(user, &path_id).await.unwrap().unwrap();
    assert_eq!(stored.progress, vec![1]);
}

#[tokio::test]
async fn exhausted_retries_surface_the_conflict() {
    let (storage, repo) = flaky_storage(100).await;
    let service = ChallengeService::new(storage, fixed_clock());
    let user = UserId::random();
    let path_id = PathId::new("ml-basics").unwrap();

    let err = service
        .submit_answer(user, &path_id, 1, "answer 1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ChallengeServiceError::Storage(StorageError::Conflict)
    ));
    // No half-applied state and no activity for a failed persist.
    assert!(
        repo.list_events(user, fixed_now() - chrono::Duration::days(1))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn concurrent_day_completions_are_unioned() {
    // Simulate the race the CAS exists for: another writer lands day 2
    // between this request's read and write. The retry must keep both
    // days instead of dropping one.
    let (storage, repo) = storage_with_catalog().await;
    let user = UserId::random();
    let path_id = PathId::new("ml-basics").unwrap();
    let now = fixed_now();

    let service = ChallengeService::new(storage.clone(), Clock::fixed(now));
    service
        .submit_answer(user, &path_id, 1, "answer 1")
        .await
        .unwrap();

    // Interloper writes day 2 directly at version 1.
    let mut interloper = repo.get_enrollment(user, &path_id).await.unwrap().unwrap();
    interloper.progress = vec![1, 2];
    interloper.completion_percentage = 40.0;
    repo.put_enrollment(&interloper).await.unwrap();

    // A fresh submission of day 3 reads the interloper's write and builds
    // on top of it.
    let result = service
        .submit_answer(user, &path_id, 3, "answer 3")
        .await
        .unwrap();

    let enrollment = result.enrollment.unwrap();
    assert_eq!(
        enrollment.progress().iter().copied().collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!((enrollment.completion_percentage() - 60.0).abs() < 1e-9);
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::model::{
    ActivityEvent, Enrollment, EnrollmentError, Path, PathId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The conditional update lost a race; re-fetch and re-apply.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── ENROLLMENT RECORD ─────────────────────────────────────────────────────────
//

/// Persisted shape for an enrollment, carrying the optimistic-concurrency
/// token.
///
/// `version` is the counter the conditional update is keyed on: `0` means
/// "I read no row" (insert), any other value must match the stored row for
/// an update to apply. Two concurrent completions of different days
/// therefore cannot silently overwrite each other; the loser sees
/// `StorageError::Conflict` and retries against a fresh read.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub user_id: UserId,
    pub path_id: PathId,
    pub progress: Vec<u32>,
    pub completion_percentage: f64,
    pub enrolled_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl EnrollmentRecord {
    /// Snapshot a domain enrollment at the version the caller read.
    ///
    /// Pass `version = 0` for an enrollment that does not exist in storage
    /// yet.
    #[must_use]
    pub fn from_enrollment(enrollment: &Enrollment, version: i64) -> Self {
        Self {
            user_id: enrollment.user_id(),
            path_id: enrollment.path_id().clone(),
            progress: enrollment.progress().iter().copied().collect(),
            completion_percentage: enrollment.completion_percentage(),
            enrolled_at: enrollment.enrolled_at(),
            last_activity_at: enrollment.last_activity_at(),
            completed_at: enrollment.completed_at(),
            version,
        }
    }

    /// Convert the record back into a domain `Enrollment`, re-running
    /// domain validation.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the persisted row violates the domain
    /// invariants (duplicate days, bad percentage, inconsistent
    /// timestamps).
    pub fn into_enrollment(self) -> Result<Enrollment, EnrollmentError> {
        Enrollment::from_persisted(
            self.user_id,
            self.path_id,
            self.progress,
            self.completion_percentage,
            self.enrolled_at,
            self.last_activity_at,
            self.completed_at,
        )
    }
}

//
// ─── REPOSITORY TRAITS ─────────────────────────────────────────────────────────
//

/// Repository contract for enrollment records.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Fetch the enrollment for `(user_id, path_id)`, or `None` if the user
    /// never started the path. "Absent" is a valid state, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_enrollment(
        &self,
        user_id: UserId,
        path_id: &PathId,
    ) -> Result<Option<EnrollmentRecord>, StorageError>;

    /// Conditionally persist an enrollment and return the new stored
    /// version.
    ///
    /// With `record.version == 0` this is an insert that must not clobber
    /// an existing row; otherwise it is an update that only applies if the
    /// stored version still matches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the condition fails; the
    /// caller must re-fetch and re-apply.
    async fn put_enrollment(&self, record: &EnrollmentRecord) -> Result<i64, StorageError>;

    /// All enrollments for a user, in unspecified order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_enrollments(&self, user_id: UserId)
        -> Result<Vec<EnrollmentRecord>, StorageError>;
}

/// Repository contract for the append-only activity log.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Append one interaction event.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn append_event(&self, event: &ActivityEvent) -> Result<(), StorageError>;

    /// Events for a user with `created_at >= since`, newest first.
    ///
    /// A time bound rather than a row count: callers rendering a window
    /// must see every event inside it no matter how busy the recent days
    /// were.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_events(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>, StorageError>;
}

/// Repository contract for the path catalog.
#[async_trait]
pub trait PathRepository: Send + Sync {
    /// Persist or update a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn upsert_path(&self, path: &Path) -> Result<(), StorageError>;

    /// Fetch a path by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_path(&self, id: &PathId) -> Result<Option<Path>, StorageError>;

    /// The full catalog in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_paths(&self) -> Result<Vec<Path>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Implements the full conditional-update contract, so services tests
/// exercise the same conflict paths the SQLite backend produces.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    enrollments: Arc<Mutex<HashMap<(UserId, PathId), EnrollmentRecord>>>,
    events: Arc<Mutex<Vec<ActivityEvent>>>,
    paths: Arc<Mutex<Vec<Path>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn get_enrollment(
        &self,
        user_id: UserId,
        path_id: &PathId,
    ) -> Result<Option<EnrollmentRecord>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(user_id, path_id.clone())).cloned())
    }

    async fn put_enrollment(&self, record: &EnrollmentRecord) -> Result<i64, StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (record.user_id, record.path_id.clone());

        let new_version = match guard.get(&key) {
            None if record.version == 0 => 1,
            Some(existing) if existing.version == record.version => record.version + 1,
            _ => return Err(StorageError::Conflict),
        };

        let mut stored = record.clone();
        stored.version = new_version;
        guard.insert(key, stored);
        Ok(new_version)
    }

    async fn list_enrollments(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActivityRepository for InMemoryRepository {
    async fn append_event(&self, event: &ActivityEvent) -> Result<(), StorageError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(event.clone());
        Ok(())
    }

    async fn list_events(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>, StorageError> {
        let guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut events: Vec<ActivityEvent> = guard
            .iter()
            .filter(|event| event.user_id() == user_id && event.created_at() >= since)
            .cloned()
            .collect();
        events.sort_by_key(|event| std::cmp::Reverse(event.created_at()));
        Ok(events)
    }
}

#[async_trait]
impl PathRepository for InMemoryRepository {
    async fn upsert_path(&self, path: &Path) -> Result<(), StorageError> {
        let mut guard = self
            .paths
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.iter_mut().find(|existing| existing.id() == path.id()) {
            Some(existing) => *existing = path.clone(),
            None => guard.push(path.clone()),
        }
        Ok(())
    }

    async fn get_path(&self, id: &PathId) -> Result<Option<Path>, StorageError> {
        let guard = self
            .paths
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().find(|path| path.id() == id).cloned())
    }

    async fn list_paths(&self) -> Result<Vec<Path>, StorageError> {
        let guard = self
            .paths
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the three repositories behind trait objects for easy backend
/// swapping.
///
/// One long-lived handle per process, injected into request-scoped service
/// calls.
#[derive(Clone)]
pub struct Storage {
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub activity: Arc<dyn ActivityRepository>,
    pub paths: Arc<dyn PathRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo.clone());
        let activity: Arc<dyn ActivityRepository> = Arc::new(repo.clone());
        let paths: Arc<dyn PathRepository> = Arc::new(repo);
        Self {
            enrollments,
            activity,
            paths,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

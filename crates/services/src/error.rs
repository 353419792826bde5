//! Shared error types for the services crate.

use thiserror::Error;

use pulse_core::model::EnrollmentError;
use pulse_core::progress::ProgressError;
use storage::repository::StorageError;

/// Errors emitted by `ChallengeService`.
///
/// `Storage(StorageError::Conflict)` here means the bounded retry loop was
/// exhausted; callers should surface it rather than retry blindly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChallengeServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardServiceError {
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#![forbid(unsafe_code)]

//! Request-scoped orchestration over the pure course-progress engine and
//! the store adapter: submission handling with conflict retry, and
//! dashboard assembly.

pub mod challenge_service;
pub mod dashboard_service;
pub mod error;

pub use pulse_core::Clock;

pub use challenge_service::{CHALLENGE_COMPLETED_EVENT, ChallengeService, SubmissionResult};
pub use dashboard_service::{
    DASHBOARD_VISIT_EVENT, DashboardService, DashboardView, PathCard,
};
pub use error::{ChallengeServiceError, DashboardServiceError};

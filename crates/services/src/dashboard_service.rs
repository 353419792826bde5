use chrono::Duration;
use serde_json::json;

use pulse_core::activity::{CalendarDay, DEFAULT_WINDOW_DAYS, activity_calendar, streak};
use pulse_core::catalog::{FreeTierAllowList, visible_paths};
use pulse_core::model::{ActivityEvent, Enrollment, PathId, UserAccount, UserId};
use pulse_core::resume::next_day;
use pulse_core::time::Clock;
use storage::repository::Storage;

use crate::error::DashboardServiceError;

/// Event kind appended on every dashboard load.
pub const DASHBOARD_VISIT_EVENT: &str = "dashboard_visit";

//
// ─── VIEW TYPES ────────────────────────────────────────────────────────────────
//

/// One catalog entry as the dashboard renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCard {
    pub path_id: PathId,
    pub name: String,
    /// 0 for a never-started path.
    pub completion_percentage: f64,
    /// The day to link to; 1 for a never-started path.
    pub next_day: u32,
    pub completed: bool,
}

/// Everything the dashboard needs in one read.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub paths: Vec<PathCard>,
    /// Distinct-day completion count for the current path (the enrollment
    /// with the latest activity), 0 if the user never started anything.
    pub streak: u32,
    /// Trailing 28-day heatmap, oldest first.
    pub calendar: Vec<CalendarDay>,
}

//
// ─── DASHBOARD SERVICE ─────────────────────────────────────────────────────────
//

/// Read-side orchestration: assembles the tier-filtered catalog, per-path
/// progress cards, the streak, and the activity heatmap.
pub struct DashboardService {
    storage: Storage,
    clock: Clock,
}

impl DashboardService {
    #[must_use]
    pub fn new(storage: Storage, clock: Clock) -> Self {
        Self { storage, clock }
    }

    /// Builds the dashboard for an account.
    ///
    /// The "current" path is derived as the most recently active
    /// enrollment rather than stored, so it cannot drift from reality.
    ///
    /// # Errors
    ///
    /// Returns `DashboardServiceError` on storage failure or if a persisted
    /// enrollment fails domain validation.
    pub async fn dashboard(
        &self,
        account: &UserAccount,
        allow: &FreeTierAllowList,
    ) -> Result<DashboardView, DashboardServiceError> {
        let catalog = self.storage.paths.list_paths().await?;
        let visible = visible_paths(&catalog, account.tier(), allow);

        let mut enrollments = Vec::new();
        for record in self.storage.enrollments.list_enrollments(account.id()).await? {
            enrollments.push(record.into_enrollment()?);
        }

        let mut paths = Vec::with_capacity(visible.len());
        for path in visible {
            let enrollment = enrollments
                .iter()
                .find(|enrollment| enrollment.path_id() == path.id());
            paths.push(PathCard {
                path_id: path.id().clone(),
                name: path.name().to_owned(),
                completion_percentage: enrollment
                    .map_or(0.0, Enrollment::completion_percentage),
                next_day: next_day(enrollment, path.challenge_count()),
                completed: enrollment.is_some_and(Enrollment::is_completed),
            });
        }

        let current = enrollments
            .iter()
            .max_by_key(|enrollment| enrollment.last_activity_at());

        // Fetch by window start, not by row count: every event inside the
        // calendar window must be seen however busy the recent days were.
        // One extra day of slack covers the partial day at the boundary;
        // the calendar ignores anything outside its buckets.
        let now = self.clock.now();
        let since = now - Duration::days(i64::from(DEFAULT_WINDOW_DAYS));
        let events = self
            .storage
            .activity
            .list_events(account.id(), since)
            .await?;

        Ok(DashboardView {
            paths,
            streak: streak(current),
            calendar: activity_calendar(&events, DEFAULT_WINDOW_DAYS, now),
        })
    }

    /// Logs a dashboard visit to the activity feed.
    ///
    /// # Errors
    ///
    /// Returns `DashboardServiceError` on storage failure.
    pub async fn record_visit(&self, user_id: UserId) -> Result<(), DashboardServiceError> {
        let event = ActivityEvent::new(user_id, DASHBOARD_VISIT_EVENT, self.clock.now(), json!({}));
        self.storage.activity.append_event(&event).await?;
        Ok(())
    }
}

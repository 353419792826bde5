use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::HashSet;

use crate::model::{ActivityEvent, Enrollment};

/// Window the dashboard heatmap renders: the trailing four weeks.
pub const DEFAULT_WINDOW_DAYS: u32 = 28;

//
// ─── STREAK ────────────────────────────────────────────────────────────────────
//

/// Streak counter for the user's currently selected path.
///
/// Historical quirk, preserved on purpose: this counts distinct completed
/// days, not consecutive calendar days of activity. A user who solved days
/// {1, 2, 4} weeks apart still shows a streak of 3.
#[must_use]
pub fn streak(enrollment: Option<&Enrollment>) -> u32 {
    enrollment.map_or(0, Enrollment::completed_days)
}

//
// ─── ACTIVITY CALENDAR ─────────────────────────────────────────────────────────
//

/// One bucket of the activity heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_active: bool,
}

/// Builds the trailing `window_days` calendar-day buckets ending today
/// (inclusive), oldest first.
///
/// A bucket is active iff at least one event's `created_at`, truncated to a
/// UTC calendar day, falls on that date. This reflects raw interaction
/// events only; enrollments and course progress are deliberately not
/// consulted.
///
/// # Panics
///
/// Panics if `window_days == 0` (programming error upstream).
#[must_use]
pub fn activity_calendar(
    events: &[ActivityEvent],
    window_days: u32,
    now: DateTime<Utc>,
) -> Vec<CalendarDay> {
    assert!(window_days >= 1, "window_days must be >= 1");

    let active: HashSet<NaiveDate> = events
        .iter()
        .map(|event| event.created_at().date_naive())
        .collect();

    let today = now.date_naive();
    (0..window_days)
        .rev()
        .map(|offset| {
            let date = today - Days::new(u64::from(offset));
            CalendarDay {
                date,
                is_active: active.contains(&date),
            }
        })
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

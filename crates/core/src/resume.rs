use crate::model::Enrollment;

/// Computes the next day the UI should present for an enrollment.
///
/// Policy: resume from the highest completed day, not the lowest unsolved
/// one. A user who solved days {1, 2, 4} resumes at 5; gaps are tolerated,
/// never auto-filled. Once the final day is solved the resolver keeps
/// pointing at it so a finished path revisits its last challenge instead of
/// advancing past the end.
///
/// Always returns a value in `1..=challenge_count`.
///
/// # Panics
///
/// Panics if `challenge_count == 0` (programming error upstream).
#[must_use]
pub fn next_day(enrollment: Option<&Enrollment>, challenge_count: u32) -> u32 {
    assert!(challenge_count >= 1, "challenge_count must be >= 1");

    match enrollment.and_then(Enrollment::highest_day) {
        None => 1,
        Some(m) if m >= challenge_count => challenge_count,
        Some(m) => m + 1,
    }
}

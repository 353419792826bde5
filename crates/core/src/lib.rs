#![forbid(unsafe_code)]

//! Pure course-progress engine: the data model and the derived-state rules
//! (enrollment progress, resume day, streak, activity calendar, catalog
//! visibility). No I/O lives here; callers fetch records, invoke these
//! functions, and persist the results.

pub mod activity;
pub mod catalog;
pub mod model;
pub mod progress;
pub mod resume;
pub mod time;

pub use time::Clock;

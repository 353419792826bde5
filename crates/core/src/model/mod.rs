mod account;
mod enrollment;
mod event;
mod ids;
mod path;

pub use account::{ParseTierError, SubscriptionTier, UserAccount};
pub use enrollment::{Enrollment, EnrollmentError};
pub use event::ActivityEvent;
pub use ids::{ParseIdError, PathId, UserId};
pub use path::{Challenge, Path, PathError};

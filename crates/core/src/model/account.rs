use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::UserId;

/// Subscription level gating catalog visibility.
///
/// Flipped to `Paid` by the billing webhook; this crate only ever reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Paid,
}

impl SubscriptionTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Paid => "paid",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a stored tier string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTierError {
    raw: String,
}

impl fmt::Display for ParseTierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown subscription tier: {}", self.raw)
    }
}

impl std::error::Error for ParseTierError {}

impl FromStr for SubscriptionTier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "paid" => Ok(SubscriptionTier::Paid),
            other => Err(ParseTierError {
                raw: other.to_owned(),
            }),
        }
    }
}

/// The slice of a user account the engine needs: identity and tier.
///
/// Authentication, profile fields, and billing state live with their
/// respective services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: UserId,
    email: String,
    tier: SubscriptionTier,
}

impl UserAccount {
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>, tier: SubscriptionTier) -> Self {
        Self {
            id,
            email: email.into(),
            tier,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn tier(&self) -> SubscriptionTier {
        self.tier
    }
}

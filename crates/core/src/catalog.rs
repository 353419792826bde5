use std::collections::HashSet;

use crate::model::{Path, PathId, SubscriptionTier};

/// Paths granted to free-tier accounts.
///
/// This is configuration, not business logic: the set is loaded from
/// wherever the deployment keeps it (the demo seed grants `"ml-basics"`)
/// and injected into the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeTierAllowList {
    ids: HashSet<PathId>,
}

impl FreeTierAllowList {
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = PathId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, id: &PathId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Filters the catalog down to what the account's tier may see.
///
/// Paid accounts see everything; free accounts see exactly the allow-listed
/// paths. Catalog order is preserved in both cases. Pure filter over
/// already-fetched data, with no storage or network access.
#[must_use]
pub fn visible_paths<'a>(
    paths: &'a [Path],
    tier: SubscriptionTier,
    allow: &FreeTierAllowList,
) -> Vec<&'a Path> {
    match tier {
        SubscriptionTier::Paid => paths.iter().collect(),
        SubscriptionTier::Free => paths
            .iter()
            .filter(|path| allow.contains(path.id()))
            .collect(),
    }
}

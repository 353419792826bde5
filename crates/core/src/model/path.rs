use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::PathId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    #[error("path name cannot be empty")]
    EmptyName,

    #[error("challenge day must be >= 1")]
    InvalidChallengeDay,

    #[error("challenge task cannot be empty")]
    EmptyTask,

    #[error("duplicate challenge day {day}")]
    DuplicateDay { day: u32 },

    #[error("path must declare at least one challenge")]
    NoChallenges,
}

//
// ─── CHALLENGE ─────────────────────────────────────────────────────────────────
//

/// One day's task within a path.
///
/// The expected output is compared case-sensitively against user answers;
/// it is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    day: u32,
    task: String,
    expected_output: String,
}

impl Challenge {
    /// Creates a challenge for the given day.
    ///
    /// # Errors
    ///
    /// Returns `PathError::InvalidChallengeDay` for day 0 and
    /// `PathError::EmptyTask` for a blank task.
    pub fn new(
        day: u32,
        task: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Result<Self, PathError> {
        if day == 0 {
            return Err(PathError::InvalidChallengeDay);
        }
        let task = task.into();
        if task.trim().is_empty() {
            return Err(PathError::EmptyTask);
        }

        Ok(Self {
            day,
            task: task.trim().to_owned(),
            expected_output: expected_output.into(),
        })
    }

    #[must_use]
    pub fn day(&self) -> u32 {
        self.day
    }

    #[must_use]
    pub fn task(&self) -> &str {
        &self.task
    }

    #[must_use]
    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }
}

//
// ─── PATH ──────────────────────────────────────────────────────────────────────
//

/// A named curriculum of daily challenges.
///
/// Catalog entries are created by content management and read-only to the
/// engine. Challenge days are unique within a path and held sorted by day;
/// they are not required to start at 1 or be contiguous, though the product
/// convention is days `1..=challenge_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    id: PathId,
    name: String,
    difficulty: Option<String>,
    tags: Vec<String>,
    challenges: Vec<Challenge>,
}

impl Path {
    /// Creates a new path from a catalog definition.
    ///
    /// # Errors
    ///
    /// Returns `PathError::EmptyName` for a blank name,
    /// `PathError::NoChallenges` for an empty challenge list, and
    /// `PathError::DuplicateDay` if two challenges share a day.
    pub fn new(
        id: PathId,
        name: impl Into<String>,
        difficulty: Option<String>,
        tags: Vec<String>,
        mut challenges: Vec<Challenge>,
    ) -> Result<Self, PathError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PathError::EmptyName);
        }
        if challenges.is_empty() {
            return Err(PathError::NoChallenges);
        }

        challenges.sort_by_key(Challenge::day);
        for pair in challenges.windows(2) {
            if pair[0].day == pair[1].day {
                return Err(PathError::DuplicateDay { day: pair[0].day });
            }
        }

        let difficulty = difficulty
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            difficulty,
            tags,
            challenges,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &PathId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<&str> {
        self.difficulty.as_deref()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Challenges sorted by day.
    #[must_use]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Number of challenges in this path; the denominator for completion
    /// percentages.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn challenge_count(&self) -> u32 {
        self.challenges.len() as u32
    }

    /// Looks up the challenge declared for `day`, if any.
    #[must_use]
    pub fn challenge_for_day(&self, day: u32) -> Option<&Challenge> {
        self.challenges
            .binary_search_by_key(&day, Challenge::day)
            .ok()
            .map(|idx| &self.challenges[idx])
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

use pulse_core::model::{PathId, UserId};
use std::str::FromStr;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    UserId::from_str(raw).map_err(ser)
}

pub(crate) fn path_id_from_str(raw: &str) -> Result<PathId, StorageError> {
    PathId::new(raw).map_err(ser)
}

/// Completed days are stored as a JSON array column (`"[1,3,4]"`); order
/// and uniqueness are re-validated by the domain on rehydration.
pub(crate) fn progress_to_json(days: &[u32]) -> Result<String, StorageError> {
    serde_json::to_string(days).map_err(ser)
}

pub(crate) fn progress_from_json(raw: &str) -> Result<Vec<u32>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn tags_to_json(tags: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(tags).map_err(ser)
}

pub(crate) fn tags_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

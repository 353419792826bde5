use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::UserId;

/// Append-only interaction log entry.
///
/// Events carry a free-form `kind` tag (for example `"dashboard_visit"` or
/// `"challenge_completed"`) and an opaque JSON payload. The engine never
/// mutates or deletes them; it only reads them to build the activity
/// calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    user_id: UserId,
    kind: String,
    created_at: DateTime<Utc>,
    data: Value,
}

impl ActivityEvent {
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: impl Into<String>,
        created_at: DateTime<Utc>,
        data: Value,
    ) -> Self {
        Self {
            user_id,
            kind: kind.into(),
            created_at,
            data,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use serde_json::json;

    #[test]
    fn event_carries_payload() {
        let user = UserId::random();
        let event = ActivityEvent::new(
            user,
            "challenge_completed",
            fixed_now(),
            json!({ "path_id": "ml-basics", "day": 3 }),
        );

        assert_eq!(event.user_id(), user);
        assert_eq!(event.kind(), "challenge_completed");
        assert_eq!(event.data()["day"], 3);
    }
}

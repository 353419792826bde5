use chrono::{DateTime, Utc};
use pulse_core::model::{ActivityEvent, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{ser, user_id_from_str};
use crate::repository::{ActivityRepository, StorageError};

#[async_trait::async_trait]
impl ActivityRepository for SqliteRepository {
    async fn append_event(&self, event: &ActivityEvent) -> Result<(), StorageError> {
        let data = serde_json::to_string(event.data()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO activity_events (user_id, kind, created_at, data)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(event.user_id().value().to_string())
        .bind(event.kind())
        .bind(event.created_at())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_events(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, kind, created_at, data
            FROM activity_events
            WHERE user_id = ?1 AND created_at >= ?2
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id.value().to_string())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
            let data: serde_json::Value =
                serde_json::from_str(&row.try_get::<String, _>("data").map_err(ser)?)
                    .map_err(ser)?;
            events.push(ActivityEvent::new(
                user_id,
                row.try_get::<String, _>("kind").map_err(ser)?,
                row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
                data,
            ));
        }
        Ok(events)
    }
}

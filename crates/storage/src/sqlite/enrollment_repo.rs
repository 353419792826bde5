use chrono::{DateTime, Utc};
use pulse_core::model::{PathId, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{path_id_from_str, progress_from_json, progress_to_json, ser, user_id_from_str};
use crate::repository::{EnrollmentRecord, EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn get_enrollment(
        &self,
        user_id: UserId,
        path_id: &PathId,
    ) -> Result<Option<EnrollmentRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, path_id, progress, completion_percentage,
                   enrolled_at, last_activity_at, completed_at, version
            FROM enrollments
            WHERE user_id = ?1 AND path_id = ?2
            ",
        )
        .bind(user_id.value().to_string())
        .bind(path_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => record_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn put_enrollment(&self, record: &EnrollmentRecord) -> Result<i64, StorageError> {
        let progress = progress_to_json(&record.progress)?;

        if record.version == 0 {
            // Fresh insert; an existing row means another writer got there
            // first.
            let res = sqlx::query(
                r"
                INSERT INTO enrollments
                    (user_id, path_id, progress, completion_percentage,
                     enrolled_at, last_activity_at, completed_at, version)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
                ON CONFLICT(user_id, path_id) DO NOTHING
                ",
            )
            .bind(record.user_id.value().to_string())
            .bind(record.path_id.as_str())
            .bind(progress)
            .bind(record.completion_percentage)
            .bind(record.enrolled_at)
            .bind(record.last_activity_at)
            .bind(record.completed_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

            if res.rows_affected() == 0 {
                return Err(StorageError::Conflict);
            }
            return Ok(1);
        }

        // Conditional update keyed on the version the caller read.
        let res = sqlx::query(
            r"
            UPDATE enrollments SET
                progress = ?1,
                completion_percentage = ?2,
                last_activity_at = ?3,
                completed_at = ?4,
                version = version + 1
            WHERE user_id = ?5 AND path_id = ?6 AND version = ?7
            ",
        )
        .bind(progress)
        .bind(record.completion_percentage)
        .bind(record.last_activity_at)
        .bind(record.completed_at)
        .bind(record.user_id.value().to_string())
        .bind(record.path_id.as_str())
        .bind(record.version)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(record.version + 1)
    }

    async fn list_enrollments(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, path_id, progress, completion_percentage,
                   enrolled_at, last_activity_at, completed_at, version
            FROM enrollments
            WHERE user_id = ?1
            ORDER BY path_id ASC
            ",
        )
        .bind(user_id.value().to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(record_from_row(&row)?);
        }
        Ok(records)
    }
}

fn record_from_row(row: &SqliteRow) -> Result<EnrollmentRecord, StorageError> {
    let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let path_id = path_id_from_str(&row.try_get::<String, _>("path_id").map_err(ser)?)?;
    let progress = progress_from_json(&row.try_get::<String, _>("progress").map_err(ser)?)?;

    Ok(EnrollmentRecord {
        user_id,
        path_id,
        progress,
        completion_percentage: row.try_get::<f64, _>("completion_percentage").map_err(ser)?,
        enrolled_at: row.try_get::<DateTime<Utc>, _>("enrolled_at").map_err(ser)?,
        last_activity_at: row
            .try_get::<DateTime<Utc>, _>("last_activity_at")
            .map_err(ser)?,
        completed_at: row
            .try_get::<Option<DateTime<Utc>>, _>("completed_at")
            .map_err(ser)?,
        version: row.try_get::<i64, _>("version").map_err(ser)?,
    })
}

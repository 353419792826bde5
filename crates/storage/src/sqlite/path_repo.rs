use pulse_core::model::{Challenge, Path, PathId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{path_id_from_str, ser, tags_from_json, tags_to_json};
use crate::repository::{PathRepository, StorageError};

#[async_trait::async_trait]
impl PathRepository for SqliteRepository {
    async fn upsert_path(&self, path: &Path) -> Result<(), StorageError> {
        let tags = tags_to_json(path.tags())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO paths (id, name, difficulty, tags)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                difficulty = excluded.difficulty,
                tags = excluded.tags
            ",
        )
        .bind(path.id().as_str())
        .bind(path.name())
        .bind(path.difficulty())
        .bind(tags)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Challenge sets are small; replacing them wholesale keeps the
        // update atomic with the path row.
        sqlx::query("DELETE FROM challenges WHERE path_id = ?1")
            .bind(path.id().as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for challenge in path.challenges() {
            sqlx::query(
                r"
                INSERT INTO challenges (path_id, day, task, expected_output)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(path.id().as_str())
            .bind(i64::from(challenge.day()))
            .bind(challenge.task())
            .bind(challenge.expected_output())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn get_path(&self, id: &PathId) -> Result<Option<Path>, StorageError> {
        let row = sqlx::query("SELECT id, name, difficulty, tags FROM paths WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => self.path_from_row(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_paths(&self) -> Result<Vec<Path>, StorageError> {
        let rows =
            sqlx::query("SELECT id, name, difficulty, tags FROM paths ORDER BY rowid ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut paths = Vec::with_capacity(rows.len());
        for row in rows {
            paths.push(self.path_from_row(&row).await?);
        }
        Ok(paths)
    }
}

impl SqliteRepository {
    async fn path_from_row(&self, row: &SqliteRow) -> Result<Path, StorageError> {
        let id = path_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
        let name = row.try_get::<String, _>("name").map_err(ser)?;
        let difficulty = row.try_get::<Option<String>, _>("difficulty").map_err(ser)?;
        let tags = tags_from_json(&row.try_get::<String, _>("tags").map_err(ser)?)?;

        let challenge_rows = sqlx::query(
            r"
            SELECT day, task, expected_output
            FROM challenges
            WHERE path_id = ?1
            ORDER BY day ASC
            ",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut challenges = Vec::with_capacity(challenge_rows.len());
        for challenge_row in challenge_rows {
            let day = u32::try_from(challenge_row.try_get::<i64, _>("day").map_err(ser)?)
                .map_err(|_| StorageError::Serialization("day overflow".into()))?;
            challenges.push(
                Challenge::new(
                    day,
                    challenge_row.try_get::<String, _>("task").map_err(ser)?,
                    challenge_row
                        .try_get::<String, _>("expected_output")
                        .map_err(ser)?,
                )
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            );
        }

        Path::new(id, name, difficulty, tags, challenges)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

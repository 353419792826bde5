use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: paths with their challenges, enrollments with
/// the optimistic-concurrency version column, and the append-only activity
/// log with its lookup index.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS paths (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    difficulty TEXT,
                    tags TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS challenges (
                    path_id TEXT NOT NULL,
                    day INTEGER NOT NULL CHECK (day >= 1),
                    task TEXT NOT NULL,
                    expected_output TEXT NOT NULL,
                    PRIMARY KEY (path_id, day),
                    FOREIGN KEY (path_id) REFERENCES paths(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS enrollments (
                    user_id TEXT NOT NULL,
                    path_id TEXT NOT NULL,
                    progress TEXT NOT NULL,
                    completion_percentage REAL NOT NULL
                        CHECK (completion_percentage BETWEEN 0 AND 100),
                    enrolled_at TEXT NOT NULL,
                    last_activity_at TEXT NOT NULL,
                    completed_at TEXT,
                    version INTEGER NOT NULL CHECK (version >= 1),
                    PRIMARY KEY (user_id, path_id),
                    FOREIGN KEY (path_id) REFERENCES paths(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS activity_events (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    data TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_activity_events_user_created
                ON activity_events(user_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_enrollments_user
                ON enrollments(user_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?1)")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}

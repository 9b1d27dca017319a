use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use super::types::{Entry, StorageError, StoredEntry};

/// SQLite-backed persistence sink.
///
/// Cheap to clone (wraps a connection pool). The pipeline only depends
/// on the narrow contract here: open, bulk insert with skip-on-duplicate
/// semantics, and read helpers for reporting and tests.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database and run migrations.
    ///
    /// Pass `":memory:"` for an ephemeral database (tests). In-memory
    /// SQLite databases are per-connection, so the pool is capped at a
    /// single connection in that case.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let (url, max_connections) = if path == ":memory:" {
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite:{}?mode=rwc", path), 5)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY,
                feed_source_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                link TEXT UNIQUE NOT NULL,
                description TEXT NOT NULL,
                content TEXT NOT NULL,
                preview_image_url TEXT,
                published_at INTEGER,
                ingested_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_feed ON entries(feed_source_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entries_published ON entries(published_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Bulk-insert entries, skipping any whose link already exists.
    ///
    /// One transaction per call — a feed's entries land atomically or
    /// not at all. Returns the number of rows actually inserted;
    /// duplicates count as skipped, not as errors.
    pub async fn bulk_insert_entries(&self, entries: &[Entry]) -> Result<usize, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for entry in entries {
            let result = sqlx::query(
                r#"
                INSERT INTO entries
                    (feed_source_id, title, link, description, content,
                     preview_image_url, published_at, ingested_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(link) DO NOTHING
            "#,
            )
            .bind(entry.feed_source_id)
            .bind(&entry.title)
            .bind(&entry.link)
            .bind(&entry.description)
            .bind(&entry.content)
            .bind(&entry.preview_image_url)
            .bind(entry.published_at)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// All entries for one feed source, newest first.
    pub async fn entries_for_feed(
        &self,
        feed_source_id: i64,
    ) -> Result<Vec<StoredEntry>, StorageError> {
        let entries = sqlx::query_as::<_, StoredEntry>(
            r#"
            SELECT id, feed_source_id, title, link, description, content,
                   preview_image_url, published_at, ingested_at
            FROM entries
            WHERE feed_source_id = ?
            ORDER BY published_at DESC, ingested_at DESC
        "#,
        )
        .bind(feed_source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Total number of persisted entries.
    pub async fn count_entries(&self) -> Result<i64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Schema migration failed on open.
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error.
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// The canonical persisted unit: one feed item after parsing,
/// enrichment, and assembly.
///
/// Uniqueness key is `link` — the sink silently skips entries whose link
/// already exists in storage. Entries are append-only; a later ingestion
/// run never updates a persisted row.
///
/// `description` and `content` intentionally hold the same text: the
/// persisted schema keeps both fields and the feed side only ever
/// supplies one value for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub feed_source_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub content: String,
    /// Absent when the linked page had no usable Open Graph image.
    pub preview_image_url: Option<String>,
    /// Unix timestamp; `None` when the item's publication date text
    /// could not be parsed.
    pub published_at: Option<i64>,
}

/// An entry as read back from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredEntry {
    pub id: i64,
    pub feed_source_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub content: String,
    pub preview_image_url: Option<String>,
    pub published_at: Option<i64>,
    pub ingested_at: i64,
}

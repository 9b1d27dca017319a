use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::enrich::Enrichment;
use super::parser::RawItem;
use crate::storage::Entry;

/// Result of normalizing an item's publication date text.
///
/// Feeds carry dates in whatever format they like; an unparsable or
/// empty string is data to tolerate, not a reason to drop the entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishedDate {
    /// Unix timestamp (UTC).
    Valid(i64),
    /// The original text, kept for logging. Persisted as NULL.
    Invalid(String),
}

/// Parse a publication date string into a timestamp.
///
/// Tries RFC 2822 (RSS), RFC 3339 (Atom), then a few common naive
/// formats. Naive values are taken as UTC.
pub fn normalize_pub_date(text: &str) -> PublishedDate {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return PublishedDate::Invalid(text.to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return PublishedDate::Valid(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return PublishedDate::Valid(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return PublishedDate::Valid(dt.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return PublishedDate::Valid(dt.and_utc().timestamp());
        }
    }

    PublishedDate::Invalid(text.to_string())
}

/// Join one parsed item with its enrichment result into a canonical
/// [`Entry`]. Pure function, no side effects beyond a debug log for
/// unparsable dates.
///
/// The item's description is mapped verbatim into both `description`
/// and `content` — the persisted schema keeps both fields.
pub fn assemble(feed_source_id: i64, item: RawItem, enrichment: Enrichment) -> Entry {
    let published_at = match normalize_pub_date(&item.pub_date_text) {
        PublishedDate::Valid(ts) => Some(ts),
        PublishedDate::Invalid(original) => {
            if !original.trim().is_empty() {
                tracing::debug!(
                    link = %item.link,
                    pub_date = %original,
                    "Unparsable publication date, storing NULL"
                );
            }
            None
        }
    };

    Entry {
        feed_source_id,
        title: item.title,
        link: item.link,
        description: item.description.clone(),
        content: item.description,
        preview_image_url: enrichment.preview_image_url,
        published_at,
    }
}

//! gleaner — selector-driven feed ingestion with Open Graph enrichment.
//!
//! Fetches a configured list of RSS/Atom/XML feeds, extracts entries
//! using per-hostname selector rules, enriches each entry with a
//! preview image from its linked page, and persists new entries into
//! SQLite, skipping duplicate links.

pub mod config;
pub mod ingest;
pub mod markup;
pub mod storage;

//! The feed-to-record ingestion pipeline.
//!
//! Per feed: resolve the hostname's extraction rules, fetch the feed
//! document, evaluate the configured selectors against it, enrich each
//! item with an Open Graph preview image from its linked page, assemble
//! canonical entries, and bulk-insert them with duplicate links skipped.
//!
//! The submodules map onto the pipeline stages:
//!
//! - [`fetcher`] - HTTP retrieval with timeout and size bounds
//! - [`parser`] - selector-driven extraction from feed markup
//! - [`enrich`] - best-effort preview image lookup (never fails)
//! - [`assembler`] - date normalization and entry assembly (pure)
//! - [`runner`] - the per-feed orchestrator and batch loop

mod assembler;
mod enrich;
mod fetcher;
mod parser;
mod runner;

pub use assembler::{assemble, normalize_pub_date, PublishedDate};
pub use enrich::{enrich, enrich_all, Enrichment};
pub use fetcher::{fetch_text, http_client, FetchError};
pub use parser::{parse_feed, FeedMetadata, ParseError, ParsedFeed, RawItem, SelectorSet};
pub use runner::{ingest_feed, run_batch, BatchSummary, FeedReport, IngestError};

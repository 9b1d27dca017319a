use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::assembler::assemble;
use super::enrich::enrich_all;
use super::fetcher::{fetch_text, FetchError};
use super::parser::{parse_feed, FeedMetadata, ParseError, SelectorSet};
use crate::config::{Config, FeedSource};
use crate::storage::{Database, Entry, StorageError};

/// Everything that can end one feed's ingestion early.
///
/// Each variant is fatal for the feed it occurred on and for that feed
/// only — the orchestrator logs it and moves on to the next feed.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The configured feed URL could not be parsed or has no hostname.
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    /// No media source is configured for the feed's hostname.
    #[error("No media source configured for hostname {0}")]
    ConfigNotFound(String),

    /// The feed document itself could not be fetched. (Page fetches
    /// during enrichment never surface here.)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Pipeline stage the error belongs to, for log correlation.
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::InvalidUrl(_) | IngestError::ConfigNotFound(_) => "resolving-config",
            IngestError::Fetch(_) => "fetching",
            IngestError::Parse(_) => "parsing",
            IngestError::Storage(_) => "persisting",
        }
    }
}

/// Result of one successfully ingested feed, handed to the observer
/// after persistence. Output formatting lives with the observer, not
/// in the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct FeedReport {
    pub feed_source_id: i64,
    pub url: String,
    pub feed: FeedMetadata,
    pub entries: Vec<Entry>,
    /// Rows actually inserted; the rest were duplicate links.
    pub inserted: usize,
}

/// Aggregate outcome of a whole batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub inserted: usize,
}

/// Ingest a single configured feed end to end.
///
/// Stages: resolve config → fetch → parse → enrich → assemble →
/// persist. Enrichment fans out concurrently per item; everything else
/// is sequential. Enrichment failures degrade to absent preview images
/// and never abort the feed.
pub async fn ingest_feed(
    db: &Database,
    client: &reqwest::Client,
    config: &Config,
    feed: &FeedSource,
) -> Result<FeedReport, IngestError> {
    tracing::debug!(feed = %feed.url, stage = "resolving-config", "Ingesting feed");
    let hostname = hostname_of(&feed.url)?;
    let source = config
        .media_source_for(&hostname)
        .ok_or_else(|| IngestError::ConfigNotFound(hostname.clone()))?;
    let selectors = SelectorSet::compile(source)?;

    tracing::debug!(feed = %feed.url, stage = "fetching", "Fetching feed document");
    let markup = fetch_text(client, &feed.url, config.fetch_timeout()).await?;

    tracing::debug!(feed = %feed.url, stage = "parsing", "Parsing feed document");
    let parsed = parse_feed(&markup, &selectors)?;

    tracing::debug!(
        feed = %feed.url,
        stage = "enriching",
        items = parsed.items.len(),
        "Fetching preview images"
    );
    let links: Vec<String> = parsed.items.iter().map(|i| i.link.clone()).collect();
    let enrichments = enrich_all(client, &links, config.fetch_timeout()).await;

    tracing::debug!(feed = %feed.url, stage = "assembling", "Assembling entries");
    let entries: Vec<Entry> = parsed
        .items
        .into_iter()
        .zip(enrichments)
        .map(|(item, enrichment)| assemble(feed.id, item, enrichment))
        .collect();

    tracing::debug!(feed = %feed.url, stage = "persisting", entries = entries.len(), "Persisting entries");
    let inserted = db.bulk_insert_entries(&entries).await?;

    Ok(FeedReport {
        feed_source_id: feed.id,
        url: feed.url.clone(),
        feed: parsed.metadata,
        entries,
        inserted,
    })
}

/// Run the whole configured batch, one feed at a time.
///
/// Feeds are processed strictly sequentially to bound outbound request
/// pressure; only the per-item enrichment inside a feed fans out. A
/// failed feed is logged and skipped — it never halts the batch. The
/// observer fires once per successful feed, after its entries are
/// persisted.
pub async fn run_batch(
    db: &Database,
    client: &reqwest::Client,
    config: &Config,
    mut observer: impl FnMut(&FeedReport),
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for feed in &config.feeds {
        match ingest_feed(db, client, config, feed).await {
            Ok(report) => {
                tracing::info!(
                    feed = %feed.url,
                    entries = report.entries.len(),
                    inserted = report.inserted,
                    "Feed ingested"
                );
                summary.succeeded += 1;
                summary.inserted += report.inserted;
                observer(&report);
            }
            Err(e) => {
                tracing::error!(
                    feed = %feed.url,
                    stage = e.stage(),
                    error = %e,
                    "Feed ingestion failed"
                );
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        inserted = summary.inserted,
        "Batch complete"
    );
    summary
}

fn hostname_of(url: &str) -> Result<String, IngestError> {
    let parsed = Url::parse(url).map_err(|_| IngestError::InvalidUrl(url.to_string()))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| IngestError::InvalidUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_of() {
        assert_eq!(
            hostname_of("https://blog.example.com/feed.xml").unwrap(),
            "blog.example.com"
        );
        assert_eq!(hostname_of("http://127.0.0.1:8080/rss").unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_hostname_of_invalid() {
        assert!(matches!(
            hostname_of("not a url"),
            Err(IngestError::InvalidUrl(_))
        ));
        // scheme without a host
        assert!(matches!(
            hostname_of("mailto:someone@example.com"),
            Err(IngestError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_error_stage_mapping() {
        assert_eq!(
            IngestError::ConfigNotFound("x".into()).stage(),
            "resolving-config"
        );
        assert_eq!(
            IngestError::Fetch(FetchError::HttpStatus(404)).stage(),
            "fetching"
        );
    }
}

use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::time::Duration;

use super::fetcher::fetch_text;

/// Upper bound on in-flight page fetches per feed.
const MAX_CONCURRENT_ENRICHMENTS: usize = 8;

const OG_IMAGE_SELECTOR: &str = r#"meta[property="og:image"]"#;

/// Outcome of inspecting an item's linked page.
///
/// Always produced — enrichment is a total function. Absence covers
/// every failure mode: empty link, network error, non-2xx status,
/// missing or empty Open Graph tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub preview_image_url: Option<String>,
}

impl Enrichment {
    fn absent() -> Self {
        Enrichment {
            preview_image_url: None,
        }
    }
}

/// Fetch an item's linked page and extract its Open Graph preview image.
///
/// Never fails: a single broken link must not abort ingestion of the
/// rest of the feed. An empty link short-circuits without any network
/// call.
pub async fn enrich(client: &reqwest::Client, link: &str, timeout: Duration) -> Enrichment {
    if link.is_empty() {
        return Enrichment::absent();
    }

    match fetch_text(client, link, timeout).await {
        Ok(html) => Enrichment {
            preview_image_url: extract_og_image(&html),
        },
        Err(e) => {
            tracing::debug!(link = %link, error = %e, "Preview page fetch failed");
            Enrichment::absent()
        }
    }
}

/// Enrich all item links of one feed concurrently.
///
/// Fan-out is bounded and the output order matches the input order, so
/// results join positionally with the parsed items.
pub async fn enrich_all(
    client: &reqwest::Client,
    links: &[String],
    timeout: Duration,
) -> Vec<Enrichment> {
    stream::iter(links)
        .map(|link| enrich(client, link, timeout))
        .buffered(MAX_CONCURRENT_ENRICHMENTS)
        .collect()
        .await
}

/// Content attribute of the first `og:image` meta tag, if present.
fn extract_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(OG_IMAGE_SELECTOR).ok()?;
    document
        .select(&selector)
        .next()?
        .value()
        .attr("content")
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(String::from)
}

use serde::Serialize;
use thiserror::Error;

use crate::config::MediaSource;
use crate::markup::{evaluate, Document, MarkupError, Selector, SelectorError, DOCUMENT};

const DEFAULT_TITLE: &str = "No title";
const DEFAULT_DESCRIPTION: &str = "No description";
const DEFAULT_DATE: &str = "No date";

/// Errors that can occur while parsing a feed document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The markup itself could not be parsed. The only hard failure:
    /// selectors that match nothing produce defaults, not errors.
    #[error("Unparsable feed markup: {0}")]
    Markup(#[from] MarkupError),

    /// A configured selector string did not compile.
    #[error("Invalid {field} selector: {source}")]
    Selector {
        field: &'static str,
        source: SelectorError,
    },
}

/// Feed-level metadata, recomputed on every run and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedMetadata {
    pub title: String,
    pub description: String,
    pub last_updated: String,
}

/// One feed item as extracted, before enrichment. Missing fields are
/// empty strings — absence is data, not error.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date_text: String,
}

/// Result of parsing one feed document.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub metadata: FeedMetadata,
    /// In document order; this is the order entries reach the sink.
    pub items: Vec<RawItem>,
}

/// The compiled form of a [`MediaSource`]'s selector rules.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    feed_title: Selector,
    feed_description: Selector,
    feed_last_updated: Selector,
    item: Selector,
    item_title: Selector,
    item_link: Selector,
    item_description: Selector,
    item_pubdate: Selector,
}

impl SelectorSet {
    /// Compile all selector strings of a media source.
    ///
    /// Fails with the offending field name on the first string that does
    /// not compile.
    pub fn compile(source: &MediaSource) -> Result<Self, ParseError> {
        let compile = |field: &'static str, s: &str| {
            Selector::parse(s).map_err(|source| ParseError::Selector { field, source })
        };

        Ok(SelectorSet {
            feed_title: compile("feed_title", &source.feed_title_selector)?,
            feed_description: compile("feed_desc", &source.feed_desc_selector)?,
            feed_last_updated: compile(
                "feed_last_updated",
                &source.feed_last_updated_selector,
            )?,
            item: compile("item", &source.item_selector)?,
            item_title: compile("item_title", &source.item_title_selector)?,
            item_link: compile("item_link", &source.item_link_selector)?,
            item_description: compile("item_desc", &source.item_desc_selector)?,
            item_pubdate: compile("item_pubdate", &source.item_pubdate_selector)?,
        })
    }
}

/// Parse feed markup against a compiled selector set.
///
/// Feed-level selectors run once against the whole document and fall
/// back to fixed sentinels (`"No title"`, `"No description"`,
/// `"No date"`). Item selectors run relative to each node the item
/// selector matched, falling back to empty strings. A selector match
/// whose text is empty counts as no match.
pub fn parse_feed(markup: &str, selectors: &SelectorSet) -> Result<ParsedFeed, ParseError> {
    let doc = Document::parse(markup)?;

    let metadata = FeedMetadata {
        title: evaluate(&doc, DOCUMENT, &selectors.feed_title)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: evaluate(&doc, DOCUMENT, &selectors.feed_description)
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        last_updated: evaluate(&doc, DOCUMENT, &selectors.feed_last_updated)
            .unwrap_or_else(|| DEFAULT_DATE.to_string()),
    };

    let items = selectors
        .item
        .select_all(&doc, DOCUMENT)
        .into_iter()
        .map(|node| RawItem {
            title: evaluate(&doc, node, &selectors.item_title).unwrap_or_default(),
            link: evaluate(&doc, node, &selectors.item_link).unwrap_or_default(),
            description: evaluate(&doc, node, &selectors.item_description).unwrap_or_default(),
            pub_date_text: evaluate(&doc, node, &selectors.item_pubdate).unwrap_or_default(),
        })
        .collect();

    Ok(ParsedFeed { metadata, items })
}

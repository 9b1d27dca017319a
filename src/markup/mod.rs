//! Markup query layer for selector-driven extraction.
//!
//! Feed documents are parsed into a small XML element tree ([`Document`])
//! and addressed with compiled tag-path selectors ([`Selector`]). The
//! split keeps the extraction interface stable — `evaluate(query, scope)
//! -> text` — while the per-source configurability stays in plain
//! strings.
//!
//! HTML pages fetched during enrichment do *not* go through this layer;
//! they are real HTML and are parsed with the `scraper` crate instead.

mod dom;
mod selector;

pub use dom::{Document, MarkupError, NodeId, DOCUMENT};
pub use selector::{evaluate, Selector, SelectorError};

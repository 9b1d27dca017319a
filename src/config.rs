//! Configuration file parser for the ingestion run.
//!
//! The config file supplies everything the pipeline treats as external
//! input: the per-hostname extraction rules (`[[sources]]`), the list of
//! feeds to ingest (`[[feeds]]`), the database path, and the fetch
//! timeout. Unlike a preferences file, it is mandatory — without a feed
//! list there is nothing to do.
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Two `[[sources]]` entries share a hostname; resolution would be
    /// ambiguous.
    #[error("Duplicate source hostname in config: {0}")]
    DuplicateHostname(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Extraction ruleset for one media source, keyed by feed hostname.
///
/// Each selector field holds a tag-path query over the feed markup
/// (see [`crate::markup::Selector`] for the dialect). A selector that
/// matches nothing yields the documented default value, never an error;
/// a selector that does not even compile fails the feed at parse time.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaSource {
    /// Stable identifier. Assigned sequentially at load when omitted.
    #[serde(default)]
    pub id: i64,
    /// Exact hostname this ruleset applies to. No subdomain fallback.
    pub hostname: String,
    pub feed_title_selector: String,
    pub feed_desc_selector: String,
    pub feed_last_updated_selector: String,
    /// Selects the repeated item node set.
    pub item_selector: String,
    /// Evaluated relative to each item node.
    pub item_title_selector: String,
    pub item_link_selector: String,
    pub item_desc_selector: String,
    pub item_pubdate_selector: String,
}

/// One configured feed to ingest.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSource {
    /// Stable identifier, recorded on every entry this feed produces.
    /// Assigned sequentially at load when omitted.
    #[serde(default)]
    pub id: i64,
    pub url: String,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database file.
    pub database_path: String,

    /// Bound on every outbound HTTP request (feed and page fetches).
    pub fetch_timeout_secs: u64,

    /// Per-hostname extraction rulesets.
    pub sources: Vec<MediaSource>,

    /// Feeds to ingest, processed in order.
    pub feeds: Vec<FeedSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "gleaner.db".to_string(),
            fetch_timeout_secs: 30,
            sources: Vec::new(),
            feeds: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::Io)` — the feed list is required
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown top-level keys → accepted, logged as warning
    /// - Omitted `id` fields → assigned sequentially (1-based) per list
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["database_path", "fetch_timeout_secs", "sources", "feeds"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        config.assign_missing_ids();
        config.check_hostnames()?;

        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Look up the extraction ruleset for a feed hostname.
    ///
    /// Exact match only — `blog.example.com` does not resolve to a
    /// source configured for `example.com`.
    pub fn media_source_for(&self, hostname: &str) -> Option<&MediaSource> {
        self.sources.iter().find(|s| s.hostname == hostname)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    fn assign_missing_ids(&mut self) {
        for (i, source) in self.sources.iter_mut().enumerate() {
            if source.id == 0 {
                source.id = i as i64 + 1;
            }
        }
        for (i, feed) in self.feeds.iter_mut().enumerate() {
            if feed.id == 0 {
                feed.id = i as i64 + 1;
            }
        }
    }

    fn check_hostnames(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.hostname.as_str()) {
                return Err(ConfigError::DuplicateHostname(source.hostname.clone()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
database_path = "feeds.db"
fetch_timeout_secs = 10

[[sources]]
hostname = "example.com"
feed_title_selector = "channel > title"
feed_desc_selector = "channel > description"
feed_last_updated_selector = "channel > lastBuildDate"
item_selector = "item"
item_title_selector = "title"
item_link_selector = "link"
item_desc_selector = "description"
item_pubdate_selector = "pubDate"

[[feeds]]
url = "https://example.com/feed.xml"

[[feeds]]
id = 7
url = "https://example.com/other.xml"
"#;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gleaner_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gleaner.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_full_config() {
        let path = write_config("full", FULL_CONFIG);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.database_path, "feeds.db");
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.feeds.len(), 2);

        let source = config.media_source_for("example.com").unwrap();
        assert_eq!(source.item_selector, "item");
        assert_eq!(source.id, 1); // assigned

        assert_eq!(config.feeds[0].id, 1); // assigned
        assert_eq!(config.feeds[1].id, 7); // explicit

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/tmp/gleaner_test_nonexistent.toml");
        assert!(matches!(Config::load(path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let path = write_config("empty", "");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.database_path, "gleaner.db");
        assert_eq!(config.fetch_timeout_secs, 30);
        assert!(config.feeds.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let path = write_config("invalid", "this is not [valid toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_exact_hostname_match_only() {
        let path = write_config("hostname", FULL_CONFIG);
        let config = Config::load(&path).unwrap();

        assert!(config.media_source_for("example.com").is_some());
        assert!(config.media_source_for("blog.example.com").is_none());
        assert!(config.media_source_for("EXAMPLE.COM").is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_duplicate_hostname_rejected() {
        let doubled = format!(
            "{}{}",
            FULL_CONFIG,
            r#"
[[sources]]
hostname = "example.com"
feed_title_selector = "t"
feed_desc_selector = "d"
feed_last_updated_selector = "u"
item_selector = "i"
item_title_selector = "t"
item_link_selector = "l"
item_desc_selector = "d"
item_pubdate_selector = "p"
"#
        );
        let path = write_config("duplicate", &doubled);
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::DuplicateHostname(_))
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let content = "a".repeat(1_048_577);
        let path = write_config("too_large", &content);
        assert!(matches!(Config::load(&path), Err(ConfigError::TooLarge(_))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_selector_field_is_parse_error() {
        let path = write_config(
            "missing_field",
            r#"
[[sources]]
hostname = "example.com"
item_selector = "item"
"#,
        );
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        std::fs::remove_file(&path).ok();
    }
}

// src/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_FEEDS_PATH: &str = "NEWSGLOBE_FEEDS_PATH";

/// World-news feeds queried when no config file overrides them.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.bbci.co.uk/news/world/rss.xml",
    "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
    "https://www.aljazeera.com/xml/rss/all.xml",
    "https://www.theguardian.com/world/rss",
    "https://www.reuters.com/rssFeed/worldNews",
    "https://feeds.washingtonpost.com/rss/world",
    "https://www.ft.com/rss/world",
    "https://www.scmp.com/rss/91/feed",
    "https://www.thehindu.com/news/international/feeder/default.rss",
    "https://www.smh.com.au/rss/world.xml",
];

/// Tuning values for the aggregation pipeline. These are configuration
/// defaults, not hard contracts; tests override them freely.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Stories per enrichment completion call in the batch pipeline.
    pub enrich_batch_size: usize,
    /// Stories per chunk in the streaming pipeline.
    pub stream_chunk_size: usize,
    /// Pause between enrichment batches (rate limiting).
    pub batch_delay: Duration,
    /// Pacing between stories replayed from cache in streaming mode.
    pub replay_delay: Duration,
    /// Most-recent items each feed may contribute.
    pub per_feed_cap: usize,
    /// Overall cap on the merged story list.
    pub max_stories: usize,
    pub cache_ttl: Duration,
    pub feed_timeout: Duration,
    /// Chunk size for the bounded geocoding variant.
    pub geocode_chunk_size: usize,
    pub geocode_chunk_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enrich_batch_size: 10,
            stream_chunk_size: 5,
            batch_delay: Duration::from_millis(1000),
            replay_delay: Duration::from_millis(50),
            per_feed_cap: 10,
            max_stories: 100,
            cache_ttl: Duration::from_secs(10 * 60),
            feed_timeout: Duration::from_secs(10),
            geocode_chunk_size: 10,
            geocode_chunk_delay: Duration::from_millis(1000),
        }
    }
}

/// Load the feed list from an explicit TOML path (`feeds = [...]`).
pub fn load_feeds_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed list from {}", path.display()))?;
    parse_feeds(&content)
}

/// Load the feed list using env var + fallbacks:
/// 1) $NEWSGLOBE_FEEDS_PATH
/// 2) config/feeds.toml
/// 3) built-in DEFAULT_FEEDS
pub fn load_feeds_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_FEEDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("NEWSGLOBE_FEEDS_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    Ok(DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect())
}

fn parse_feeds(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct FeedsToml {
        feeds: Vec<String>,
    }
    let v: FeedsToml = toml::from_str(s).context("parsing feeds toml")?;
    Ok(clean_list(v.feeds))
}

/// Trim entries, drop empties, keep first occurrence in file order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn parse_feeds_trims_and_dedups_in_order() {
        let toml = r#"feeds = [" https://a.test/rss ", "", "https://b.test/rss", "https://a.test/rss"]"#;
        let out = parse_feeds(toml).unwrap();
        assert_eq!(
            out,
            vec![
                "https://a.test/rss".to_string(),
                "https://b.test/rss".to_string()
            ]
        );
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so a real config/ in the repo does not interfere.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_FEEDS_PATH);

        // No files in temp CWD -> built-in defaults
        let v = load_feeds_default().unwrap();
        assert_eq!(v.len(), DEFAULT_FEEDS.len());

        // Env var takes precedence
        let p = tmp.path().join("feeds.toml");
        fs::write(&p, r#"feeds = ["https://x.test/rss"]"#).unwrap();
        env::set_var(ENV_FEEDS_PATH, p.display().to_string());
        let v2 = load_feeds_default().unwrap();
        assert_eq!(v2, vec!["https://x.test/rss".to_string()]);
        env::remove_var(ENV_FEEDS_PATH);

        env::set_current_dir(&old).unwrap();
    }
}

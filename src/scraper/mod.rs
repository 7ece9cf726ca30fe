// src/scraper/mod.rs
pub mod newsapi;
pub mod rss;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::{self, PipelineConfig};
use crate::types::RawStory;
use newsapi::NewsApiSource;
use rss::RssFeed;

/// A single story source. A failing source contributes nothing to a fetch;
/// it never aborts the overall run.
#[async_trait::async_trait]
pub trait StorySource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<Vec<RawStory>>;
    fn name(&self) -> &str;
}

/// One-time metrics registration (so series show up on an exporter, if any).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_items_total", "Raw stories parsed from sources.");
        describe_counter!(
            "scrape_source_errors_total",
            "Source fetch/parse errors (isolated per source)."
        );
        describe_counter!(
            "scrape_dedup_removed_total",
            "Stories removed by title deduplication."
        );
        describe_histogram!("scrape_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Strip tags and entities from feed-provided HTML-ish text, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Dedup key for a title: lowercase, strip non-alphanumerics (spaces kept),
/// trim, first 50 chars. Heuristic, not semantic: punctuation variants of a
/// title collapse, paraphrases do not.
pub fn normalize_title_key(title: &str) -> String {
    static RE_NON_ALNUM: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_NON_ALNUM.get_or_init(|| regex::Regex::new(r"[^a-z0-9\s]").unwrap());
    let lowered = title.to_lowercase();
    let stripped = re.replace_all(&lowered, "");
    stripped.trim().chars().take(50).collect()
}

/// Keep the first story per normalized title key, in input order.
pub fn dedup_stories(stories: Vec<RawStory>) -> Vec<RawStory> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(stories.len());
    for story in stories {
        if seen.insert(normalize_title_key(&story.title)) {
            out.push(story);
        }
    }
    out
}

/// Stable sort, newest first. Ties keep their prior relative order.
pub fn sort_by_date(stories: &mut [RawStory]) {
    stories.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Fetches raw story candidates from the configured feeds plus the optional
/// headline API, then dedups, sorts, and caps the merged list.
pub struct Scraper {
    sources: Vec<Arc<dyn StorySource>>,
    newsapi: Arc<NewsApiSource>,
    max_stories: usize,
}

impl Scraper {
    /// Build the default source set: every configured feed plus NewsAPI
    /// (skipped at fetch time when no key is present).
    pub fn new(newsapi_key: Option<String>, cfg: &PipelineConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("newsglobe/0.1 (+news aggregation pipeline)")
            .timeout(cfg.feed_timeout)
            .build()
            .expect("reqwest client");

        let feeds = config::load_feeds_default().unwrap_or_else(|e| {
            warn!(error = ?e, "feed config unreadable, using built-in defaults");
            config::DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect()
        });

        let newsapi = Arc::new(NewsApiSource::new(newsapi_key, client.clone()));
        let mut sources: Vec<Arc<dyn StorySource>> = feeds
            .into_iter()
            .map(|url| {
                Arc::new(RssFeed::new(url, client.clone(), cfg.per_feed_cap))
                    as Arc<dyn StorySource>
            })
            .collect();
        sources.push(newsapi.clone() as Arc<dyn StorySource>);

        Self {
            sources,
            newsapi,
            max_stories: cfg.max_stories,
        }
    }

    /// Explicit source injection, used by tests.
    pub fn with_sources(
        sources: Vec<Arc<dyn StorySource>>,
        newsapi: Arc<NewsApiSource>,
        max_stories: usize,
    ) -> Self {
        Self {
            sources,
            newsapi,
            max_stories,
        }
    }

    /// Fan out to every source, settle all, fold the successes. Per-source
    /// failure is logged and contributes an empty result.
    pub async fn fetch_news(&self) -> Vec<RawStory> {
        ensure_metrics_described();

        let fetches = self.sources.iter().map(|source| async move {
            match source.fetch().await {
                Ok(stories) => {
                    debug!(source = source.name(), count = stories.len(), "source fetched");
                    stories
                }
                Err(e) => {
                    warn!(error = ?e, source = source.name(), "source fetch failed");
                    counter!("scrape_source_errors_total").increment(1);
                    Vec::new()
                }
            }
        });

        let all: Vec<RawStory> = join_all(fetches).await.into_iter().flatten().collect();
        let before = all.len();

        let mut unique = dedup_stories(all);
        counter!("scrape_dedup_removed_total").increment((before - unique.len()) as u64);

        sort_by_date(&mut unique);
        unique.truncate(self.max_stories);

        debug!(count = unique.len(), "fetch complete");
        unique
    }

    /// One parallel headline-API request per country code; filter + dedup
    /// only (no cross-source merge, no global sort). Empty without a key.
    pub async fn fetch_news_by_countries(&self, codes: &[String]) -> Vec<RawStory> {
        ensure_metrics_described();

        if !self.newsapi.has_key() {
            warn!("no NewsAPI key provided, skipping country-specific fetch");
            return Vec::new();
        }

        let fetches = codes.iter().map(|code| async move {
            match self.newsapi.fetch_country(code).await {
                Ok(stories) => stories,
                Err(e) => {
                    warn!(error = ?e, country = code.as_str(), "country fetch failed");
                    counter!("scrape_source_errors_total").increment(1);
                    Vec::new()
                }
            }
        });

        let all: Vec<RawStory> = join_all(fetches).await.into_iter().flatten().collect();
        dedup_stories(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(title: &str, ts: i64) -> RawStory {
        RawStory {
            title: title.to_string(),
            description: format!("{title} description"),
            url: format!("https://example.test/{ts}"),
            published_at: ts,
            source: "Test".to_string(),
        }
    }

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Hello&nbsp;&nbsp;world</b> &amp; more  ";
        assert_eq!(normalize_text(s), "Hello world & more");
    }

    #[test]
    fn title_key_drops_punctuation_and_case() {
        assert_eq!(
            normalize_title_key("Breaking: Floods hit Valencia!"),
            normalize_title_key("breaking floods hit valencia")
        );
    }

    #[test]
    fn title_key_truncates_to_fifty_chars() {
        let long = "a".repeat(80);
        assert_eq!(normalize_title_key(&long).chars().count(), 50);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let stories = vec![
            story("Floods hit Valencia", 10),
            story("Floods hit Valencia!!!", 20),
            story("Another story", 30),
        ];
        let out = dedup_stories(stories);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].published_at, 10);
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut stories = vec![story("a", 5), story("b", 9), story("c", 9), story("d", 1)];
        sort_by_date(&mut stories);
        let titles: Vec<&str> = stories.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "a", "d"]);
    }
}

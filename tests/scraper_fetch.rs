// tests/scraper_fetch.rs
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use newsglobe::scraper::newsapi::NewsApiSource;
use newsglobe::scraper::{Scraper, StorySource};
use newsglobe::RawStory;

fn story(title: &str, ts: i64) -> RawStory {
    RawStory {
        title: title.to_string(),
        description: format!("{title} description"),
        url: format!("https://example.test/{ts}"),
        published_at: ts,
        source: "Feed A".to_string(),
    }
}

struct StaticSource {
    name: String,
    stories: Vec<RawStory>,
}

#[async_trait]
impl StorySource for StaticSource {
    async fn fetch(&self) -> Result<Vec<RawStory>> {
        Ok(self.stories.clone())
    }
    fn name(&self) -> &str {
        &self.name
    }
}

struct TimingOutSource;

#[async_trait]
impl StorySource for TimingOutSource {
    async fn fetch(&self) -> Result<Vec<RawStory>> {
        Err(anyhow!("connection timed out"))
    }
    fn name(&self) -> &str {
        "Feed B"
    }
}

fn keyless_newsapi() -> Arc<NewsApiSource> {
    Arc::new(NewsApiSource::new(None, reqwest::Client::new()))
}

#[tokio::test]
async fn one_failing_feed_does_not_abort_the_fetch() {
    // Feed A returns 3 valid items, feed B times out, headline API absent.
    let feed_a = StaticSource {
        name: "Feed A".to_string(),
        stories: vec![story("alpha", 10), story("bravo", 30), story("charlie", 20)],
    };
    let newsapi = keyless_newsapi();
    let sources: Vec<Arc<dyn StorySource>> = vec![
        Arc::new(feed_a),
        Arc::new(TimingOutSource),
        newsapi.clone() as Arc<dyn StorySource>,
    ];
    let scraper = Scraper::with_sources(sources, newsapi, 100);

    let out = scraper.fetch_news().await;
    assert_eq!(out.len(), 3);
    let ts: Vec<i64> = out.iter().map(|s| s.published_at).collect();
    assert_eq!(ts, vec![30, 20, 10]);
}

#[tokio::test]
async fn merged_list_is_deduped_sorted_and_capped() {
    let feed_a = StaticSource {
        name: "Feed A".to_string(),
        stories: (0..80).map(|i| story(&format!("a story {i}"), i)).collect(),
    };
    let feed_b = StaticSource {
        name: "Feed B".to_string(),
        stories: (0..80).map(|i| story(&format!("b story {i}"), 1000 + i)).collect(),
    };
    // Duplicate of a feed_b title, encountered later in input order.
    let feed_c = StaticSource {
        name: "Feed C".to_string(),
        stories: vec![story("b story 0!!!", 5000)],
    };
    let newsapi = keyless_newsapi();
    let sources: Vec<Arc<dyn StorySource>> = vec![
        Arc::new(feed_a),
        Arc::new(feed_b),
        Arc::new(feed_c),
        newsapi.clone() as Arc<dyn StorySource>,
    ];
    let scraper = Scraper::with_sources(sources, newsapi, 100);

    let out = scraper.fetch_news().await;
    assert_eq!(out.len(), 100);
    assert!(out.windows(2).all(|w| w[0].published_at >= w[1].published_at));
    // The punctuation-variant duplicate collapsed to its first occurrence.
    assert!(out.iter().all(|s| s.published_at != 5000));
}

#[tokio::test]
async fn country_fetch_without_key_returns_empty() {
    let newsapi = keyless_newsapi();
    let scraper = Scraper::with_sources(vec![], newsapi, 100);
    let out = scraper
        .fetch_news_by_countries(&["us".to_string(), "jp".to_string()])
        .await;
    assert!(out.is_empty());
}

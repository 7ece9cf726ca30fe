// src/scraper/newsapi.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use super::StorySource;
use crate::types::RawStory;

const TOP_HEADLINES_URL: &str = "https://newsapi.org/v2/top-headlines";

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}
#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<ArticleSource>,
}
#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

/// Reject articles missing title/description/url or marked as removed.
fn to_raw(article: Article, fallback_ts: i64) -> Option<RawStory> {
    let title = article.title.filter(|t| !t.trim().is_empty())?;
    let description = article.description.filter(|d| !d.trim().is_empty())?;
    let url = article.url.filter(|u| !u.trim().is_empty())?;
    if title.contains("[Removed]") {
        return None;
    }

    let published_at = article
        .published_at
        .as_deref()
        .map(parse_rfc3339_to_unix)
        .filter(|ts| *ts > 0)
        .unwrap_or(fallback_ts);

    Some(RawStory {
        title,
        description,
        url,
        published_at,
        source: article
            .source
            .and_then(|s| s.name)
            .unwrap_or_else(|| "NewsAPI".to_string()),
    })
}

/// Optional keyed headline API. Without a key every fetch is an empty
/// result, not an error.
pub struct NewsApiSource {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl NewsApiSource {
    pub fn new(api_key: Option<String>, client: reqwest::Client) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        Self { api_key, client }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Vec<RawStory>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("NewsAPI key is not configured"))?;

        let resp = self
            .client
            .get(TOP_HEADLINES_URL)
            .query(params)
            .query(&[("apiKey", key)])
            .send()
            .await
            .context("NewsAPI request failed")?;
        if !resp.status().is_success() {
            return Err(anyhow!("NewsAPI returned status {}", resp.status()));
        }

        let body: HeadlinesResponse = resp.json().await.context("decoding NewsAPI body")?;
        let now = chrono::Utc::now().timestamp();
        let stories: Vec<RawStory> = body
            .articles
            .into_iter()
            .filter_map(|a| to_raw(a, now))
            .collect();
        counter!("scrape_items_total").increment(stories.len() as u64);
        Ok(stories)
    }

    /// Country-scoped headline query used by `fetch_news_by_countries`.
    pub async fn fetch_country(&self, code: &str) -> Result<Vec<RawStory>> {
        self.query(&[("country", code), ("pageSize", "10")]).await
    }
}

#[async_trait]
impl StorySource for NewsApiSource {
    async fn fetch(&self) -> Result<Vec<RawStory>> {
        // No credential: skip quietly, the RSS feeds still cover the fetch.
        if !self.has_key() {
            return Ok(Vec::new());
        }
        self.query(&[("category", "general"), ("pageSize", "50")])
            .await
    }

    fn name(&self) -> &str {
        "NewsAPI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_and_incomplete_articles_are_rejected() {
        let ok = Article {
            title: Some("A title".into()),
            description: Some("A description".into()),
            url: Some("https://example.test/a".into()),
            published_at: Some("2026-08-20T10:00:00Z".into()),
            source: Some(ArticleSource {
                name: Some("Example".into()),
            }),
        };
        assert!(to_raw(ok, 0).is_some());

        let removed = Article {
            title: Some("[Removed]".into()),
            description: Some("x".into()),
            url: Some("https://example.test/b".into()),
            published_at: None,
            source: None,
        };
        assert!(to_raw(removed, 0).is_none());

        let missing_url = Article {
            title: Some("A title".into()),
            description: Some("x".into()),
            url: None,
            published_at: None,
            source: None,
        };
        assert!(to_raw(missing_url, 0).is_none());
    }

    #[test]
    fn rfc3339_dates_map_to_unix_seconds() {
        assert_eq!(parse_rfc3339_to_unix("1970-01-01T00:01:00Z"), 60);
        assert_eq!(parse_rfc3339_to_unix("not a date"), 0);
    }
}

// src/scraper/rss.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use super::{normalize_text, StorySource};
use crate::types::RawStory;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> i64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        // Some feeds use obsolete zone names ("GMT", "UT") that the strict
        // parser may reject; chrono accepts them.
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.timestamp())
        })
        .unwrap_or(0)
}

/// Parse one RSS body into raw stories. Items missing a title or link are
/// dropped; descriptions fall back to the title; at most `cap` items are
/// kept (feeds list newest first). Items without a parsable pub date get
/// `fetched_at`.
pub fn parse_feed(xml: &str, cap: usize, fetched_at: i64) -> Result<Vec<RawStory>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let source = rss
        .channel
        .title
        .map(|t| normalize_text(&t))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "RSS Feed".to_string());

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let (title, link) = match (it.title, it.link) {
            (Some(t), Some(l)) => (normalize_text(&t), l.trim().to_string()),
            _ => continue,
        };
        if title.is_empty() || link.is_empty() {
            continue;
        }

        let description = it
            .description
            .as_deref()
            .map(normalize_text)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| title.clone());

        let published_at = it
            .pub_date
            .as_deref()
            .map(parse_rfc2822_to_unix)
            .filter(|ts| *ts > 0)
            .unwrap_or(fetched_at);

        out.push(RawStory {
            title,
            description,
            url: link,
            published_at,
            source: source.clone(),
        });
        if out.len() >= cap {
            break;
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("scrape_parse_ms").record(ms);
    counter!("scrape_items_total").increment(out.len() as u64);
    Ok(out)
}

/// One syndication feed endpoint.
pub struct RssFeed {
    url: String,
    client: reqwest::Client,
    cap: usize,
}

impl RssFeed {
    pub fn new(url: impl Into<String>, client: reqwest::Client, cap: usize) -> Self {
        Self {
            url: url.into(),
            client,
            cap,
        }
    }
}

#[async_trait]
impl StorySource for RssFeed {
    async fn fetch(&self) -> Result<Vec<RawStory>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?;
        if !resp.status().is_success() {
            return Err(anyhow!("feed {} returned {}", self.url, resp.status()));
        }
        let body = resp.text().await.context("reading feed body")?;
        parse_feed(&body, self.cap, chrono::Utc::now().timestamp())
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// quick-xml rejects bare HTML entities, so swap the common ones up front.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

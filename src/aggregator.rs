//! Orchestration of the fetch → enrich → geocode → cache pipeline, in a
//! batch and a streaming flavor sharing the same business logic.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::ai::{CompletionClient, OpenAiClient};
use crate::cache::{NewsCache, GLOBAL_KEY};
use crate::config::PipelineConfig;
use crate::enricher::Enricher;
use crate::geocoding::Geocoder;
use crate::scraper::Scraper;
use crate::types::GeolocatedStory;

pub struct NewsAggregator {
    scraper: Scraper,
    enricher: Enricher,
    geocoder: Geocoder,
    cache: Arc<NewsCache>,
    config: PipelineConfig,
}

impl NewsAggregator {
    /// Default wiring: OpenAI completion client, configured feeds, optional
    /// headline API, fresh cache.
    pub fn new(openai_key: impl Into<String>, newsapi_key: Option<String>) -> Self {
        let config = PipelineConfig::default();
        let ai: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(openai_key, None));
        Self::with_parts(
            Scraper::new(newsapi_key, &config),
            Enricher::new(ai.clone(), config.enrich_batch_size, config.batch_delay),
            Geocoder::new(ai),
            Arc::new(NewsCache::new(config.cache_ttl)),
            config,
        )
    }

    /// Explicit construction with injected parts. There is no process-wide
    /// singleton; independent aggregators own independent caches.
    pub fn with_parts(
        scraper: Scraper,
        enricher: Enricher,
        geocoder: Geocoder,
        cache: Arc<NewsCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            scraper,
            enricher,
            geocoder,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &NewsCache {
        &self.cache
    }

    /// Batch pipeline. Cache-first under `"global"`; zero raw stories is a
    /// valid empty result and is NOT cached.
    pub async fn aggregate_news(&self, use_cache: bool) -> Result<Vec<GeolocatedStory>> {
        if use_cache {
            if let Some(cached) = self.cache.get(GLOBAL_KEY) {
                return Ok(cached);
            }
        }

        info!("starting news aggregation pipeline");

        let raw = self.scraper.fetch_news().await;
        if raw.is_empty() {
            warn!("no stories fetched from sources");
            return Ok(Vec::new());
        }

        let enriched = self.enricher.enrich_all(raw).await;
        let located = self.geocoder.resolve_all(enriched).await;
        let valid: Vec<GeolocatedStory> = located
            .into_iter()
            .filter(|s| !s.coords.is_unknown())
            .collect();

        info!(stories = valid.len(), "aggregation pipeline complete");
        self.cache.set(GLOBAL_KEY, valid.clone());
        Ok(valid)
    }

    /// Country-scoped pipeline under a composite cache key. The unknown
    /// sentinel is filtered here too, matching the global pipeline.
    pub async fn aggregate_news_by_countries(
        &self,
        codes: &[String],
        use_cache: bool,
    ) -> Result<Vec<GeolocatedStory>> {
        let key = format!("countries:{}", codes.join(","));

        if use_cache {
            if let Some(cached) = self.cache.get(&key) {
                return Ok(cached);
            }
        }

        let raw = self.scraper.fetch_news_by_countries(codes).await;
        let enriched = self.enricher.enrich_all(raw).await;
        let located = self.geocoder.resolve_all(enriched).await;
        let valid: Vec<GeolocatedStory> = located
            .into_iter()
            .filter(|s| !s.coords.is_unknown())
            .collect();

        self.cache.set(&key, valid.clone());
        Ok(valid)
    }

    /// Clear the cache and force a fresh batch run. The fresh result still
    /// lands in the cache at the end of the run.
    pub async fn refresh_cache(&self) -> Result<Vec<GeolocatedStory>> {
        self.cache.clear();
        self.aggregate_news(false).await
    }

    /// Streaming pipeline: emit stories through `on_story` as chunks finish.
    /// A cache hit is replayed story-by-story with a small pacing delay to
    /// preserve the progressive-loading contract. Chunk stages absorb their
    /// own failures (enrichment and geocoding degrade, never abort), so a
    /// bad chunk cannot prevent later chunks from being attempted.
    pub async fn aggregate_news_streaming<F>(&self, use_cache: bool, mut on_story: F) -> Result<()>
    where
        F: FnMut(GeolocatedStory),
    {
        if use_cache {
            if let Some(cached) = self.cache.get(GLOBAL_KEY) {
                for story in cached {
                    on_story(story);
                    tokio::time::sleep(self.config.replay_delay).await;
                }
                return Ok(());
            }
        }

        info!("starting streaming news aggregation pipeline");

        let raw = self.scraper.fetch_news().await;
        if raw.is_empty() {
            warn!("no stories fetched from sources");
            return Ok(());
        }

        // Small chunks trade completion-call overhead for a lower
        // time-to-first-result.
        let chunks: Vec<Vec<_>> = raw
            .chunks(self.config.stream_chunk_size.max(1))
            .map(|c| c.to_vec())
            .collect();

        let mut all = Vec::new();
        for chunk in chunks {
            let enriched = self.enricher.enrich_batch(chunk).await;
            let located = self.geocoder.resolve_all(enriched).await;
            for story in located.into_iter().filter(|s| !s.coords.is_unknown()) {
                on_story(story.clone());
                all.push(story);
            }
        }

        info!(stories = all.len(), "streaming pipeline complete");
        self.cache.set(GLOBAL_KEY, all);
        Ok(())
    }
}

// src/lib.rs
// Public library surface for integration tests (and the demo binary).

pub mod aggregator;
pub mod ai;
pub mod cache;
pub mod config;
pub mod enricher;
pub mod geocoding;
pub mod scraper;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::NewsAggregator;
pub use crate::cache::{NewsCache, GLOBAL_KEY};
pub use crate::config::PipelineConfig;
pub use crate::types::{
    Coordinates, EnrichedStory, GeolocatedStory, NewsCategory, RawStory, Urgency,
};

// src/types.rs
use serde::{Deserialize, Serialize};

/// Coarse story classification assigned during enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    #[default]
    Politics,
    Conflict,
    Environment,
    Tech,
    Health,
    Economy,
}

/// Recency/importance tier assigned during enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Breaking,
    Recent,
    #[default]
    Standard,
}

/// Geographic coordinate pair. `(0,0)` is the "location unknown" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const UNKNOWN: Coordinates = Coordinates { lat: 0.0, lng: 0.0 };

    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_unknown(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// An unprocessed news item as retrieved from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStory {
    pub title: String,
    pub description: String,
    pub url: String,
    /// Publish time, unix seconds.
    #[serde(rename = "publishedAt")]
    pub published_at: i64,
    pub source: String,
}

/// A raw story plus AI-derived annotations. Position i in an enriched batch
/// always describes position i of the raw batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedStory {
    #[serde(flatten)]
    pub raw: RawStory,
    /// Free-text location, e.g. "Tokyo, Japan".
    pub location: String,
    pub summary: String,
    pub category: NewsCategory,
    pub urgency: Urgency,
}

/// Terminal representation returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocatedStory {
    #[serde(flatten)]
    pub enriched: EnrichedStory,
    pub coords: Coordinates,
}

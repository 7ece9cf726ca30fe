//! Free-text location resolution with a layered lookup: exact-match store,
//! curated city table, curated country table, then AI fallback. Resolution
//! never fails; unresolvable input maps to the `(0,0)` sentinel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::{CompletionClient, CompletionRequest};
use crate::types::{Coordinates, EnrichedStory, GeolocatedStory};

const GEOCODE_SYSTEM: &str = "You are a geocoding assistant. Return only valid JSON with lat and lng coordinates for the given location. If uncertain, provide the capital city or major city of the mentioned country/region.";

/// Exact-string coordinate store. Injectable so tests can observe cache
/// population directly.
pub trait CoordStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Coordinates>;
    fn put(&self, key: &str, coords: Coordinates);
}

/// Default store: unbounded in-memory map, last writer wins. Acceptable
/// because location strings are low-cardinality relative to story volume.
#[derive(Default)]
pub struct MemoryCoordStore {
    inner: Mutex<HashMap<String, Coordinates>>,
}

impl CoordStore for MemoryCoordStore {
    fn get(&self, key: &str) -> Option<Coordinates> {
        self.inner
            .lock()
            .expect("coord store mutex poisoned")
            .get(key)
            .copied()
    }

    fn put(&self, key: &str, coords: Coordinates) {
        self.inner
            .lock()
            .expect("coord store mutex poisoned")
            .insert(key.to_string(), coords);
    }
}

/// Centroids for countries/regions appearing in location text. The
/// "Unknown" entry routes enrichment-fallback locations straight to the
/// sentinel without an AI call.
const COUNTRY_COORDS: &[(&str, Coordinates)] = &[
    ("Unknown", Coordinates::new(0.0, 0.0)),
    ("United States", Coordinates::new(37.0902, -95.7129)),
    ("United Kingdom", Coordinates::new(55.3781, -3.4360)),
    ("France", Coordinates::new(46.2276, 2.2137)),
    ("Germany", Coordinates::new(51.1657, 10.4515)),
    ("China", Coordinates::new(35.8617, 104.1954)),
    ("Japan", Coordinates::new(36.2048, 138.2529)),
    ("India", Coordinates::new(20.5937, 78.9629)),
    ("Brazil", Coordinates::new(-14.2350, -51.9253)),
    ("Australia", Coordinates::new(-25.2744, 133.7751)),
    ("Russia", Coordinates::new(61.5240, 105.3188)),
    ("Canada", Coordinates::new(56.1304, -106.3468)),
    ("Mexico", Coordinates::new(23.6345, -102.5528)),
    ("South Africa", Coordinates::new(-30.5595, 22.9375)),
    ("Egypt", Coordinates::new(26.8206, 30.8025)),
];

/// Major city coordinates, checked before the country table. First
/// substring match wins; table order is the tie-break.
const CITY_COORDS: &[(&str, Coordinates)] = &[
    ("New York", Coordinates::new(40.7128, -74.0060)),
    ("London", Coordinates::new(51.5074, -0.1278)),
    ("Paris", Coordinates::new(48.8566, 2.3522)),
    ("Tokyo", Coordinates::new(35.6762, 139.6503)),
    ("Beijing", Coordinates::new(39.9042, 116.4074)),
    ("Moscow", Coordinates::new(55.7558, 37.6173)),
    ("Berlin", Coordinates::new(52.5200, 13.4050)),
    ("Sydney", Coordinates::new(-33.8688, 151.2093)),
    ("Mumbai", Coordinates::new(19.0760, 72.8777)),
    ("Dubai", Coordinates::new(25.2048, 55.2708)),
    ("Singapore", Coordinates::new(1.3521, 103.8198)),
    ("Hong Kong", Coordinates::new(22.3193, 114.1694)),
    ("Toronto", Coordinates::new(43.6532, -79.3832)),
    ("Mexico City", Coordinates::new(19.4326, -99.1332)),
    ("São Paulo", Coordinates::new(-23.5505, -46.6333)),
    ("Los Angeles", Coordinates::new(34.0522, -118.2437)),
    ("Chicago", Coordinates::new(41.8781, -87.6298)),
    ("San Francisco", Coordinates::new(37.7749, -122.4194)),
    ("Boston", Coordinates::new(42.3601, -71.0589)),
    ("Washington", Coordinates::new(38.9072, -77.0369)),
    ("Seoul", Coordinates::new(37.5665, 126.9780)),
    ("Bangkok", Coordinates::new(13.7563, 100.5018)),
    ("Istanbul", Coordinates::new(41.0082, 28.9784)),
    ("Cairo", Coordinates::new(30.0444, 31.2357)),
    ("Rome", Coordinates::new(41.9028, 12.4964)),
    ("Madrid", Coordinates::new(40.4168, -3.7038)),
    ("Amsterdam", Coordinates::new(52.3676, 4.9041)),
    ("Geneva", Coordinates::new(46.2044, 6.1432)),
    ("Zurich", Coordinates::new(47.3769, 8.5417)),
    ("Brussels", Coordinates::new(50.8503, 4.3517)),
    ("Vienna", Coordinates::new(48.2082, 16.3738)),
    ("Warsaw", Coordinates::new(52.2297, 21.0122)),
    ("Stockholm", Coordinates::new(59.3293, 18.0686)),
    ("Copenhagen", Coordinates::new(55.6761, 12.5683)),
    ("Oslo", Coordinates::new(59.9139, 10.7522)),
    ("Helsinki", Coordinates::new(60.1699, 24.9384)),
    ("Athens", Coordinates::new(37.9838, 23.7275)),
    ("Lisbon", Coordinates::new(38.7223, -9.1393)),
    ("Dublin", Coordinates::new(53.3498, -6.2603)),
    ("Tel Aviv", Coordinates::new(32.0853, 34.7818)),
    ("Jerusalem", Coordinates::new(31.7683, 35.2137)),
    ("Riyadh", Coordinates::new(24.7136, 46.6753)),
    ("Abu Dhabi", Coordinates::new(24.4539, 54.3773)),
    ("Doha", Coordinates::new(25.2854, 51.5310)),
    ("Kuwait City", Coordinates::new(29.3759, 47.9774)),
    ("Beirut", Coordinates::new(33.8886, 35.4955)),
    ("Baghdad", Coordinates::new(33.3152, 44.3661)),
    ("Tehran", Coordinates::new(35.6892, 51.3890)),
    ("Kabul", Coordinates::new(34.5553, 69.2075)),
    ("Islamabad", Coordinates::new(33.6844, 73.0479)),
    ("New Delhi", Coordinates::new(28.6139, 77.2090)),
    ("Dhaka", Coordinates::new(23.8103, 90.4125)),
    ("Yangon", Coordinates::new(16.8661, 96.1951)),
    ("Hanoi", Coordinates::new(21.0285, 105.8542)),
    ("Ho Chi Minh City", Coordinates::new(10.8231, 106.6297)),
    ("Manila", Coordinates::new(14.5995, 120.9842)),
    ("Jakarta", Coordinates::new(-6.2088, 106.8456)),
    ("Kuala Lumpur", Coordinates::new(3.1390, 101.6869)),
    ("Nairobi", Coordinates::new(-1.2921, 36.8219)),
    ("Lagos", Coordinates::new(6.5244, 3.3792)),
    ("Johannesburg", Coordinates::new(-26.2041, 28.0473)),
    ("Cape Town", Coordinates::new(-33.9249, 18.4241)),
    ("Buenos Aires", Coordinates::new(-34.6037, -58.3816)),
    ("Santiago", Coordinates::new(-33.4489, -70.6693)),
    ("Lima", Coordinates::new(-12.0464, -77.0428)),
    ("Bogotá", Coordinates::new(4.7110, -74.0721)),
    ("Caracas", Coordinates::new(10.4806, -66.9036)),
    ("Rio de Janeiro", Coordinates::new(-22.9068, -43.1729)),
    ("Brasília", Coordinates::new(-15.8267, -47.9218)),
    ("Melbourne", Coordinates::new(-37.8136, 144.9631)),
    ("Brisbane", Coordinates::new(-27.4698, 153.0251)),
    ("Perth", Coordinates::new(-31.9505, 115.8605)),
    ("Auckland", Coordinates::new(-36.8485, 174.7633)),
    ("Wellington", Coordinates::new(-41.2865, 174.7762)),
];

pub struct Geocoder {
    ai: Arc<dyn CompletionClient>,
    store: Arc<dyn CoordStore>,
}

impl Geocoder {
    pub fn new(ai: Arc<dyn CompletionClient>) -> Self {
        Self::with_store(ai, Arc::new(MemoryCoordStore::default()))
    }

    pub fn with_store(ai: Arc<dyn CompletionClient>, store: Arc<dyn CoordStore>) -> Self {
        Self { ai, store }
    }

    /// Resolve a free-text location to coordinates. Never fails; any
    /// unresolvable input yields `Coordinates::UNKNOWN`.
    pub async fn resolve(&self, location: &str) -> Coordinates {
        if let Some(coords) = self.lookup(location) {
            return coords;
        }
        self.resolve_with_ai(location).await
    }

    /// Layered table lookup. Successful table hits are written back to the
    /// store under the trimmed input so repeats short-circuit.
    fn lookup(&self, location: &str) -> Option<Coordinates> {
        let normalized = location.trim();

        if let Some(coords) = self.store.get(normalized) {
            counter!("geocode_cache_hits_total").increment(1);
            return Some(coords);
        }

        for (city, coords) in CITY_COORDS {
            if normalized.contains(city) {
                self.store.put(normalized, *coords);
                return Some(*coords);
            }
        }

        for (country, coords) in COUNTRY_COORDS {
            if normalized.contains(country) {
                self.store.put(normalized, *coords);
                return Some(*coords);
            }
        }

        None
    }

    async fn resolve_with_ai(&self, location: &str) -> Coordinates {
        let req = CompletionRequest {
            system: GEOCODE_SYSTEM.to_string(),
            user: format!(
                "What are the latitude and longitude coordinates for: {location}? \
                 Return only JSON in this format: {{\"lat\": number, \"lng\": number}}"
            ),
            temperature: 0.0,
        };

        let value = match self.ai.complete_json(req).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = ?e, %location, "AI geocoding failed");
                return Coordinates::UNKNOWN;
            }
        };

        let lat = value.get("lat").and_then(Value::as_f64);
        let lng = value.get("lng").and_then(Value::as_f64);
        match (lat, lng) {
            (Some(lat), Some(lng)) => {
                let coords = Coordinates::new(lat, lng);
                if !coords.in_range() {
                    warn!(%location, lat, lng, "AI geocoding returned out-of-range coordinates");
                    return Coordinates::UNKNOWN;
                }
                counter!("geocode_ai_total").increment(1);
                self.store.put(location, coords);
                coords
            }
            _ => {
                warn!(%location, "AI geocoding response missing lat/lng");
                Coordinates::UNKNOWN
            }
        }
    }

    /// Resolve every story's location concurrently. Output order matches
    /// input order.
    pub async fn resolve_all(&self, stories: Vec<EnrichedStory>) -> Vec<GeolocatedStory> {
        debug!(count = stories.len(), "geolocating stories");
        let lookups = stories.into_iter().map(|story| async move {
            let coords = self.resolve(&story.location).await;
            GeolocatedStory {
                enriched: story,
                coords,
            }
        });
        join_all(lookups).await
    }

    /// Chunked variant bounding concurrent load on the AI backend.
    pub async fn resolve_all_chunked(
        &self,
        stories: Vec<EnrichedStory>,
        chunk_size: usize,
        delay: Duration,
    ) -> Vec<GeolocatedStory> {
        let chunks: Vec<Vec<EnrichedStory>> = stories
            .chunks(chunk_size.max(1))
            .map(|c| c.to_vec())
            .collect();
        let n = chunks.len();

        let mut out = Vec::new();
        for (i, chunk) in chunks.into_iter().enumerate() {
            out.extend(self.resolve_all(chunk).await);
            if i + 1 < n {
                tokio::time::sleep(delay).await;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_table_matches_substring() {
        let hit = CITY_COORDS
            .iter()
            .find(|(city, _)| "protests in central Tokyo today".contains(city));
        assert_eq!(hit.map(|(c, _)| *c), Some("Tokyo"));
    }

    #[test]
    fn unknown_location_maps_to_sentinel_via_country_table() {
        let hit = COUNTRY_COORDS
            .iter()
            .find(|(name, _)| "Unknown Location".contains(name))
            .map(|(_, c)| *c);
        assert_eq!(hit, Some(Coordinates::UNKNOWN));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCoordStore::default();
        assert!(store.get("Tokyo, Japan").is_none());
        store.put("Tokyo, Japan", Coordinates::new(35.6762, 139.6503));
        assert_eq!(
            store.get("Tokyo, Japan"),
            Some(Coordinates::new(35.6762, 139.6503))
        );
    }
}

// tests/cache_ttl.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use newsglobe::cache::{CacheStats, Clock, NewsCache};
use newsglobe::{
    Coordinates, EnrichedStory, GeolocatedStory, NewsCategory, RawStory, Urgency, GLOBAL_KEY,
};

/// Deterministic clock advanced by hand.
#[derive(Default)]
struct ManualClock(AtomicU64);

impl ManualClock {
    fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn stories(n: usize) -> Vec<GeolocatedStory> {
    (0..n)
        .map(|i| GeolocatedStory {
            enriched: EnrichedStory {
                raw: RawStory {
                    title: format!("story {i}"),
                    description: "desc".to_string(),
                    url: format!("https://example.test/{i}"),
                    published_at: 1_700_000_000 + i as i64,
                    source: "Test".to_string(),
                },
                location: "Tokyo, Japan".to_string(),
                summary: "summary".to_string(),
                category: NewsCategory::Politics,
                urgency: Urgency::Standard,
            },
            coords: Coordinates::new(35.6762, 139.6503),
        })
        .collect()
}

const TTL: Duration = Duration::from_secs(600);

fn cache_with_clock() -> (NewsCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    (NewsCache::with_clock(TTL, clock.clone()), clock)
}

#[test]
fn entry_is_served_until_the_ttl_and_evicted_after() {
    let (cache, clock) = cache_with_clock();
    let data = stories(3);
    cache.set(GLOBAL_KEY, data.clone());

    clock.advance(TTL.as_millis() as u64 - 1);
    assert_eq!(cache.get(GLOBAL_KEY), Some(data.clone()));

    // Exactly at the TTL the entry is still valid (age > TTL evicts).
    clock.advance(1);
    assert_eq!(cache.get(GLOBAL_KEY), Some(data));

    clock.advance(1);
    assert_eq!(cache.get(GLOBAL_KEY), None);
    // The stale read evicted the entry.
    assert_eq!(cache.stats().entries, 0);
}

#[test]
fn set_overwrites_and_resets_the_timestamp() {
    let (cache, clock) = cache_with_clock();
    cache.set("global", stories(2));

    clock.advance(TTL.as_millis() as u64 - 10);
    cache.set("global", stories(5));

    // The rewritten entry survives well past the first entry's deadline.
    clock.advance(TTL.as_millis() as u64 / 2);
    let got = cache.get("global").unwrap();
    assert_eq!(got.len(), 5);
}

#[test]
fn keys_are_independent_and_exact_match_only() {
    let (cache, _clock) = cache_with_clock();
    cache.set("global", stories(1));
    cache.set("countries:us,jp", stories(2));

    assert_eq!(cache.get("global").unwrap().len(), 1);
    assert_eq!(cache.get("countries:us,jp").unwrap().len(), 2);
    assert_eq!(cache.get("countries:us"), None);
}

#[test]
fn clear_expired_drops_only_stale_entries() {
    let (cache, clock) = cache_with_clock();
    cache.set("old", stories(1));

    clock.advance(TTL.as_millis() as u64 + 1);
    cache.set("fresh", stories(4));
    cache.clear_expired();

    assert_eq!(cache.get("old"), None);
    assert_eq!(cache.get("fresh").unwrap().len(), 4);
    assert_eq!(cache.stats().entries, 1);
}

#[test]
fn clear_removes_everything() {
    let (cache, _clock) = cache_with_clock();
    cache.set("a", stories(1));
    cache.set("b", stories(2));
    cache.clear();
    assert_eq!(
        cache.stats(),
        CacheStats {
            entries: 0,
            total_stories: 0,
            oldest_age_secs: 0
        }
    );
}

#[test]
fn stats_report_totals_and_oldest_age() {
    let (cache, clock) = cache_with_clock();
    cache.set("a", stories(2));
    clock.advance(30_000);
    cache.set("b", stories(3));
    clock.advance(15_000);

    let stats = cache.stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.total_stories, 5);
    assert_eq!(stats.oldest_age_secs, 45);
}

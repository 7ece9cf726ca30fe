//! Batched AI enrichment. Best-effort annotation layer: a failed or
//! malformed completion degrades to per-field defaults and never aborts
//! the pipeline.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::{CompletionClient, CompletionRequest};
use crate::types::{EnrichedStory, RawStory};

const SYSTEM_PROMPT: &str =
    "You are a news analysis assistant. Always respond with valid JSON in the exact format requested.";

pub struct Enricher {
    ai: Arc<dyn CompletionClient>,
    batch_size: usize,
    batch_delay: Duration,
}

impl Enricher {
    pub fn new(ai: Arc<dyn CompletionClient>, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            ai,
            batch_size,
            batch_delay,
        }
    }

    /// Enrich everything in fixed-size batches with an inter-batch delay
    /// (not before the first batch, not after the last). Output length and
    /// order always match the input.
    pub async fn enrich_all(&self, stories: Vec<RawStory>) -> Vec<EnrichedStory> {
        if stories.is_empty() {
            return Vec::new();
        }
        debug!(count = stories.len(), "enriching stories");

        let batches: Vec<Vec<RawStory>> = stories
            .chunks(self.batch_size.max(1))
            .map(|c| c.to_vec())
            .collect();
        let n = batches.len();

        let mut out = Vec::with_capacity(n * self.batch_size);
        for (i, batch) in batches.into_iter().enumerate() {
            out.extend(self.enrich_batch(batch).await);
            if i + 1 < n {
                tokio::time::sleep(self.batch_delay).await;
            }
        }
        out
    }

    /// Enrich one batch with a single completion call. On any failure the
    /// whole batch falls back to defaults uniformly.
    pub async fn enrich_batch(&self, batch: Vec<RawStory>) -> Vec<EnrichedStory> {
        if batch.is_empty() {
            return Vec::new();
        }

        let req = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_prompt(&batch),
            temperature: 0.3,
        };

        match self.ai.complete_json(req).await {
            Ok(value) => {
                counter!("enrich_batches_total").increment(1);
                merge_results(batch, &value)
            }
            Err(e) => {
                warn!(error = ?e, provider = self.ai.name(), "enrichment call failed, applying fallback");
                counter!("enrich_fallback_total").increment(1);
                batch.into_iter().map(fallback_enrich).collect()
            }
        }
    }
}

fn build_prompt(batch: &[RawStory]) -> String {
    #[derive(serde::Serialize)]
    struct StoryView<'a> {
        title: &'a str,
        description: &'a str,
        #[serde(rename = "publishedAt")]
        published_at: i64,
    }

    let views: Vec<StoryView> = batch
        .iter()
        .map(|s| StoryView {
            title: &s.title,
            description: &s.description,
            published_at: s.published_at,
        })
        .collect();
    let stories_json = serde_json::to_string(&views).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Analyze these news stories and extract for each:
1. Primary location (specific city and country if mentioned, otherwise country or region)
2. A concise 20-25 word summary of the key facts
3. Category: choose ONE from [politics, conflict, environment, tech, health, economy]
4. Urgency: choose ONE from [breaking, recent, standard] based on recency and importance

Return a JSON object with a "results" array containing objects with this structure:
{{
  "results": [
    {{
      "location": "City, Country",
      "summary": "concise summary here",
      "category": "category_name",
      "urgency": "urgency_level"
    }}
  ]
}}

Stories:
{stories_json}"#
    )
}

/// Merge the model response positionally, defaulting any missing or invalid
/// per-story field. A short or malformed `results` array degrades the
/// affected stories, never the batch.
fn merge_results(batch: Vec<RawStory>, value: &Value) -> Vec<EnrichedStory> {
    let results = value.get("results").and_then(Value::as_array);

    batch
        .into_iter()
        .enumerate()
        .map(|(i, story)| {
            let entry = results.and_then(|r| r.get(i));
            let field = |name: &str| {
                entry
                    .and_then(|e| e.get(name))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };

            let location = field("location").unwrap_or_else(|| "Unknown Location".to_string());
            let summary = field("summary").unwrap_or_else(|| story.description.clone());
            let category = entry
                .and_then(|e| e.get("category"))
                .and_then(|c| serde_json::from_value(c.clone()).ok())
                .unwrap_or_default();
            let urgency = entry
                .and_then(|e| e.get("urgency"))
                .and_then(|u| serde_json::from_value(u.clone()).ok())
                .unwrap_or_default();

            EnrichedStory {
                raw: story,
                location,
                summary,
                category,
                urgency,
            }
        })
        .collect()
}

fn fallback_enrich(story: RawStory) -> EnrichedStory {
    let summary = story.description.clone();
    EnrichedStory {
        raw: story,
        location: "Unknown Location".to_string(),
        summary,
        category: Default::default(),
        urgency: Default::default(),
    }
}

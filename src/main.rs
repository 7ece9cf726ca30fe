//! Demo entrypoint: runs the batch aggregation pipeline once and prints the
//! geolocated stories as JSON. HTTP serving belongs to the embedding
//! application, not this crate.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsglobe::NewsAggregator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsglobe=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let openai_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is required")?;
    let newsapi_key = std::env::var("NEWSAPI_API_KEY").ok();

    let aggregator = NewsAggregator::new(openai_key, newsapi_key);
    let stories = aggregator.aggregate_news(true).await?;

    println!("{}", serde_json::to_string_pretty(&stories)?);
    Ok(())
}

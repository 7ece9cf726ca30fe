//! Chat-completion client abstraction used by the enricher and the geocoder.
//! Every call requests a strict JSON object; callers validate the shape
//! defensively and fall back on any deviation.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One strict-JSON completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion and return the parsed JSON object.
    async fn complete_json(&self, req: CompletionRequest) -> Result<Value>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// OpenAI provider (Chat Completions API with `json_object` response format).
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// `model_override`: pass Some("gpt-4o-mini") to override; defaults to gpt-4o-mini.
    pub fn new(api_key: impl Into<String>, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("newsglobe/0.1 (+news aggregation pipeline)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.into(),
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }

    /// Reads `OPENAI_API_KEY`; an empty key makes every call fail, which the
    /// callers absorb via their fallback paths.
    pub fn from_env() -> Self {
        Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default(), None)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete_json(&self, req: CompletionRequest) -> Result<Value> {
        if self.api_key.is_empty() {
            return Err(anyhow!("OPENAI_API_KEY is not configured"));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            response_format: ResponseFormat<'a>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &req.system,
                },
                Msg {
                    role: "user",
                    content: &req.user,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: req.temperature,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("completion request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!("completion returned status {}", resp.status()));
        }

        let parsed: Resp = resp.json().await.context("decoding completion body")?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| anyhow!("completion returned no choices"))?;

        serde_json::from_str(content).context("completion content is not valid JSON")
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

//! Chat completion client for hosted (OpenAI) and local (Ollama) models.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::analysis::types::{AnalysisError, AnalysisResult};
use crate::config::LlmConfig;

/// Ollama accepts any bearer token on its OpenAI-compatible endpoint.
const LOCAL_API_KEY: &str = "ollama";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    local: bool,
}

impl LlmClient {
    /// Hosted mode needs `api_key`; local mode ignores it.
    pub fn new(config: &LlmConfig, api_key: Option<&str>) -> AnalysisResult<Self> {
        let (base_url, model, api_key) = if config.use_local_model {
            (&config.local_api_url, &config.local_model, LOCAL_API_KEY.to_string())
        } else {
            let key = api_key.ok_or(AnalysisError::MissingApiKey)?;
            (&config.api_url, &config.model, key.to_string())
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(
            model = %model,
            local = config.use_local_model,
            "Language model configured"
        );

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.clone(),
            api_key,
            temperature: config.temperature,
            local: config.use_local_model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    /// First choice of a single-turn completion.
    pub async fn complete(&self, system: &str, prompt: &str) -> AnalysisResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, model = %self.model, "Completion request failed");
            return Err(AnalysisError::Llm(format!("HTTP {}: {}", status, truncate(&body, 200))));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| AnalysisError::Llm("empty completion".to_string()))
    }

    /// Whether the model endpoint answers `GET /models`.
    pub async fn is_reachable(&self) -> bool {
        match self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Model endpoint unreachable");
                false
            }
        }
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("local", &self.local)
            .finish()
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// The outermost `{…}` object in a model reply, if it parses.
pub fn extract_json(reply: &str) -> Option<serde_json::Value> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

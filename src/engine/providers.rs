// ── Sarathi Engine: Generation Collaborator ────────────────────────────────
//
// HTTP client for the external text-generation backend (OpenAI-compatible
// chat API). The engine never depends on the backend being up: every failure
// here is absorbed by the turn pipeline, which substitutes the branded
// fallback reply and logs the original error.

use async_trait::async_trait;
use log::{error, info, warn};
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{GenerationReply, GenerationRequest, ProposedToolCall, ToolDefinition};
use crate::engine::config::GenerationConfig;

/// Retry configuration for transient API errors.
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 1000;

/// Check if an HTTP status code should be retried.
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 529)
}

/// Sleep with exponential backoff.
async fn retry_delay(attempt: u32) -> Duration {
    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
    tokio::time::sleep(delay).await;
    delay
}

// ═══════════════════════════════════════════════════════════════════════════
// Collaborator Trait
// ═══════════════════════════════════════════════════════════════════════════

/// The text-generation collaborator: {system prompt, user message} in,
/// {text, proposed tool calls} out.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> EngineResult<GenerationReply>;
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP Implementation
// ═══════════════════════════════════════════════════════════════════════════

pub struct HttpGeneration {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    tools: Vec<ToolDefinition>,
}

impl HttpGeneration {
    pub fn new(config: &GenerationConfig, tools: Vec<ToolDefinition>) -> Self {
        HttpGeneration {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            tools,
        }
    }

    fn format_tools(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn parse_reply(body: &Value) -> EngineResult<GenerationReply> {
        let message = &body["choices"][0]["message"];
        let text = message["content"].as_str().unwrap_or("").to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let name = call["function"]["name"].as_str().unwrap_or("").to_string();
                if name.is_empty() {
                    continue;
                }
                // Arguments arrive as a JSON-encoded string; a malformed
                // blob degrades to an empty object rather than failing the
                // whole reply.
                let arguments = call["function"]["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| json!({}));
                tool_calls.push(ProposedToolCall { name, arguments });
            }
        }

        if text.is_empty() && tool_calls.is_empty() {
            return Err(EngineError::generation("generation", "empty response body"));
        }
        Ok(GenerationReply { text, tool_calls })
    }
}

#[async_trait]
impl GenerationClient for HttpGeneration {
    async fn generate(&self, request: &GenerationRequest) -> EngineResult<GenerationReply> {
        if self.api_key.trim().is_empty() {
            return Err(EngineError::generation("generation", "missing credentials"));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_message },
            ],
        });
        if !self.tools.is_empty() {
            body["tools"] = json!(self.format_tools());
        }

        info!("[generation] request to {} model={}", url, self.model);

        let mut last_error = String::new();
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay(attempt - 1).await;
                warn!(
                    "[generation] retry {}/{} after {}ms",
                    attempt,
                    MAX_RETRIES,
                    delay.as_millis()
                );
            }

            let response = match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = format!("HTTP request failed: {e}");
                    if attempt < MAX_RETRIES {
                        continue;
                    }
                    return Err(EngineError::generation("generation", last_error));
                }
            };

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body_text = response.text().await.unwrap_or_default();
                last_error =
                    format!("API error {}: {}", status, &body_text[..body_text.len().min(200)]);
                error!("[generation] {last_error}");
                if is_retryable_status(status) && attempt < MAX_RETRIES {
                    continue;
                }
                return Err(EngineError::generation("generation", last_error));
            }

            let parsed: Value = response.json().await?;
            return Self::parse_reply(&parsed);
        }

        Err(EngineError::generation("generation", last_error))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Mock Implementation (tests & offline hosts)
// ═══════════════════════════════════════════════════════════════════════════

/// Scripted collaborator: returns queued replies in order, then repeats the
/// last one. `fail_all` simulates an unreachable backend.
pub struct MockGeneration {
    replies: Mutex<Vec<GenerationReply>>,
    fail_all: bool,
}

impl MockGeneration {
    pub fn with_text(text: &str) -> Self {
        Self {
            replies: Mutex::new(vec![GenerationReply {
                text: text.to_string(),
                tool_calls: Vec::new(),
            }]),
            fail_all: false,
        }
    }

    pub fn with_reply(reply: GenerationReply) -> Self {
        Self { replies: Mutex::new(vec![reply]), fail_all: false }
    }

    pub fn failing() -> Self {
        Self { replies: Mutex::new(Vec::new()), fail_all: true }
    }
}

#[async_trait]
impl GenerationClient for MockGeneration {
    async fn generate(&self, _request: &GenerationRequest) -> EngineResult<GenerationReply> {
        if self.fail_all {
            return Err(EngineError::generation("mock", "simulated transport failure"));
        }
        let mut replies = self.replies.lock();
        if replies.len() > 1 {
            Ok(replies.remove(0))
        } else {
            replies
                .first()
                .cloned()
                .ok_or_else(|| EngineError::generation("mock", "no scripted reply"))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

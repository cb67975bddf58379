// ── Sarathi Engine: Voice Collaborator ─────────────────────────────────────
//
// Speech-synthesis client. The engine sends marked-up reply text, the derived
// emotional state, and a language code; the collaborator returns an audio
// handle or nothing. `None` (and every error, at the turn-pipeline level)
// degrades to a text-only reply — voice is always optional.

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::{json, Value};

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{AudioHandle, EmotionalState};
use crate::engine::config::VoiceConfig;
use crate::engine::emotion::modulation_for;

#[async_trait]
pub trait VoiceClient: Send + Sync {
    /// Synthesize speech for the marked-up text. `Ok(None)` means the
    /// collaborator had nothing to offer; the reply ships text-only.
    async fn synthesize(
        &self,
        markup: &str,
        state: &EmotionalState,
        language: &str,
    ) -> EngineResult<Option<AudioHandle>>;
}

/// Disabled voice — the default for hosts without a speech backend.
pub struct NullVoice;

#[async_trait]
impl VoiceClient for NullVoice {
    async fn synthesize(
        &self,
        _markup: &str,
        _state: &EmotionalState,
        _language: &str,
    ) -> EngineResult<Option<AudioHandle>> {
        Ok(None)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP Implementation
// ═══════════════════════════════════════════════════════════════════════════

pub struct HttpVoice {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpVoice {
    pub fn new(config: &VoiceConfig) -> Self {
        HttpVoice {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl VoiceClient for HttpVoice {
    async fn synthesize(
        &self,
        markup: &str,
        state: &EmotionalState,
        language: &str,
    ) -> EngineResult<Option<AudioHandle>> {
        if self.api_key.trim().is_empty() {
            return Err(EngineError::generation("voice", "missing credentials"));
        }

        let modulation = modulation_for(state);
        let body = json!({
            "text": markup,
            "language": language,
            "emotion": state.primary,
            "intensity": state.intensity,
            "modulation": modulation,
        });

        info!("[voice] synthesis request language={language}");
        let response = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EngineError::generation(
                "voice",
                format!("API error {}", response.status().as_u16()),
            ));
        }

        let parsed: Value = response.json().await?;
        // A reply without an audio id means "no audio available" — that is
        // a valid, degradable answer, not an error.
        let Some(id) = parsed["audio_id"].as_str() else {
            return Ok(None);
        };
        Ok(Some(AudioHandle {
            id: id.to_string(),
            url: parsed["url"].as_str().map(str::to_string),
            duration_ms: parsed["duration_ms"].as_u64(),
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

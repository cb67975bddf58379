// ── Sarathi Engine: Configuration ──────────────────────────────────────────
//
// All engine tuning in one serde struct, loadable from TOML. Every field has
// a default so a host can start from `EngineConfig::default()` and override
// only what it needs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::atoms::constants::FALLBACK_REPLY;
use crate::atoms::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub generation: GenerationConfig,
    pub voice: VoiceConfig,
    pub memory: MemoryConfig,
    pub orchestrator: OrchestratorConfig,
    /// Branded reply used when the generation backend fails. Never empty.
    pub fallback_reply: String,
    /// Prepend a short emotional flourish to voiced replies.
    pub phrase_variation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            voice: VoiceConfig::default(),
            memory: MemoryConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            fallback_reply: FALLBACK_REPLY.to_string(),
            phrase_variation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Bound on one generation round trip, seconds.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub base_url: String,
    pub api_key: String,
    /// BCP-47 language code sent with every synthesis request.
    pub language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            language: "en-IN".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_session_entries: usize,
    pub keep_recent: usize,
    pub importance_floor: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_session_entries: crate::atoms::constants::SESSION_MAX_ENTRIES,
            keep_recent: crate::atoms::constants::PRUNE_KEEP_RECENT,
            importance_floor: crate::atoms::constants::RETENTION_IMPORTANCE_FLOOR,
        }
    }
}

impl MemoryConfig {
    /// The retention policy this section describes, for
    /// `MemoryStore::with_policy`.
    pub fn retention_policy(&self) -> crate::engine::memory::store::RetentionPolicy {
        crate::engine::memory::store::RetentionPolicy {
            max_entries: self.max_session_entries,
            keep_recent: self.keep_recent,
            importance_floor: self.importance_floor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Bound on one tool invocation, seconds.
    pub tool_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { tool_timeout_secs: 20 }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.fallback_reply.trim().is_empty() {
            return Err(EngineError::Config("fallback_reply must not be empty".into()));
        }
        if self.memory.keep_recent > self.memory.max_session_entries {
            return Err(EngineError::Config(
                "memory.keep_recent cannot exceed memory.max_session_entries".into(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

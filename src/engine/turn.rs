// ── Sarathi Engine: Turn Pipeline ──────────────────────────────────────────
//
// One conversation turn, end to end:
//   classify → update profile → assemble personalized context → derive
//   emotional state → generation call (bounded, fallback on failure) →
//   gated tool orchestration → speech markup → optional voice synthesis →
//   append the turn to memory.
//
// Per-session turns are serialized with a session lock; cross-session turns
// run in parallel. The caller never sees a raw generation/tool error — the
// worst case is the branded fallback reply with fallback confidence.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{
    EmotionalState, GenerationRequest, MemoryCandidate, MessageClassification, TurnOutcome,
};
use crate::engine::classifier;
use crate::engine::config::EngineConfig;
use crate::engine::emotion::{self, RandomSource, SeededRandom};
use crate::engine::memory::MemoryStore;
use crate::engine::orchestrator::Orchestrator;
use crate::engine::profile::ProfileAggregator;
use crate::engine::providers::GenerationClient;
use crate::engine::sessions::SessionLocks;
use crate::engine::tools::ToolDispatcher;
use crate::engine::voice::VoiceClient;

pub struct TurnEngine {
    config: EngineConfig,
    memory: MemoryStore,
    profiles: ProfileAggregator,
    generation: Arc<dyn GenerationClient>,
    voice: Option<Arc<dyn VoiceClient>>,
    orchestrator: Orchestrator,
    sessions: SessionLocks,
    random: Arc<dyn RandomSource>,
}

impl TurnEngine {
    /// Engine with the built-in tool dispatch table and no voice backend.
    pub fn new(
        config: EngineConfig,
        memory: MemoryStore,
        profiles: ProfileAggregator,
        generation: Arc<dyn GenerationClient>,
    ) -> Self {
        let tool_timeout = Duration::from_secs(config.orchestrator.tool_timeout_secs);
        Self {
            orchestrator: Orchestrator::new(ToolDispatcher::with_builtins(), tool_timeout),
            config,
            memory,
            profiles,
            generation,
            voice: None,
            sessions: SessionLocks::new(),
            random: Arc::new(SeededRandom::new()),
        }
    }

    pub fn with_voice(mut self, voice: Arc<dyn VoiceClient>) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Replace the dispatch table (e.g. to register live booking handlers).
    pub fn with_dispatcher(mut self, dispatcher: ToolDispatcher) -> Self {
        let tool_timeout = Duration::from_secs(self.config.orchestrator.tool_timeout_secs);
        self.orchestrator = Orchestrator::new(dispatcher, tool_timeout);
        self
    }

    /// Inject a fixed random source so phrase variation becomes deterministic.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Process one traveler message. Holds the session lock for the whole
    /// turn so same-session turns never interleave.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        text: &str,
        location: Option<&str>,
    ) -> EngineResult<TurnOutcome> {
        if session_id.trim().is_empty() {
            return Err(EngineError::InvalidEntry("missing session id".into()));
        }

        let lock = self.sessions.acquire(session_id);
        let _guard = lock.lock().await;
        info!("[turn] session={session_id} chars={}", text.len());

        // ── Classify & personalize ─────────────────────────────────────
        let classification = classifier::classify(text, location);
        let sentiment = crate::engine::memory::sentiment_of(text);
        self.profiles
            .update(session_id, text, &classification, sentiment, location)?;
        let context =
            self.profiles
                .personalized_context(session_id, classification.topic, &self.memory)?;

        // ── Emotional tone ─────────────────────────────────────────────
        let state =
            emotion::derive_state(classification.topic, location, text, classification.mood);
        let modulation = emotion::modulation_for(&state);

        // ── Generation (bounded; failure → branded fallback) ───────────
        let request = GenerationRequest {
            system_prompt: self.system_prompt(&context, &classification, &state),
            user_message: text.to_string(),
        };
        let generation_timeout = Duration::from_secs(self.config.generation.timeout_secs);
        let generated =
            match tokio::time::timeout(generation_timeout, self.generation.generate(&request))
                .await
            {
                Ok(Ok(reply)) => Some(reply),
                Ok(Err(e)) => {
                    error!("[turn] generation failed, using fallback: {e}");
                    None
                }
                Err(_) => {
                    error!(
                        "[turn] generation timed out after {:?}, using fallback",
                        generation_timeout
                    );
                    None
                }
            };
        let fallback_used = generated.is_none();

        // ── Orchestration (gated tools, goal, confidence) ──────────────
        let (reply, orchestration) = match generated {
            Some(reply) => {
                let outcome = self
                    .orchestrator
                    .run(&classification, text, location.is_some(), &reply.tool_calls)
                    .await;
                (reply.text, outcome)
            }
            None => (self.config.fallback_reply.clone(), Orchestrator::fallback_outcome()),
        };

        // ── Speech markup & optional synthesis ─────────────────────────
        let mut speech_markup = emotion::speech_markup(&reply, state.primary);
        if self.config.phrase_variation {
            speech_markup = format!(
                "{} {speech_markup}",
                emotion::flourish(state.primary, self.random.as_ref())
            );
        }
        let audio = self.synthesize(&speech_markup, &state).await;

        // ── Record the turn ────────────────────────────────────────────
        self.memory.append(MemoryCandidate {
            session_id: session_id.to_string(),
            user_message: text.to_string(),
            response: reply.clone(),
            location: location.map(str::to_string),
            mood: classification.mood,
            topic: classification.topic,
            timestamp: None,
        })?;

        Ok(TurnOutcome {
            reply,
            speech_markup,
            audio,
            classification,
            emotional_state: state,
            modulation,
            autonomous_actions: orchestration.actions,
            goal: orchestration.goal,
            confidence: orchestration.confidence,
            next_steps: orchestration.next_steps,
            proactive_actions: orchestration.proactive_actions,
            fallback_used,
        })
    }

    async fn synthesize(
        &self,
        markup: &str,
        state: &EmotionalState,
    ) -> Option<crate::atoms::types::AudioHandle> {
        let voice = self.voice.as_ref()?;
        match voice
            .synthesize(markup, state, &self.config.voice.language)
            .await
        {
            Ok(audio) => audio,
            Err(e) => {
                // Voice is strictly optional: log and ship text-only.
                warn!("[turn] voice synthesis failed, text-only reply: {e}");
                None
            }
        }
    }

    fn system_prompt(
        &self,
        context: &str,
        classification: &MessageClassification,
        state: &EmotionalState,
    ) -> String {
        let mut prompt = String::from(
            "You are Sarathi, a warm local guide walking the old city with the \
             traveler. Answer concretely and briefly; offer one suggestion at a \
             time.\n",
        );
        prompt.push_str(&format!(
            "Current read: topic={}, mood={:?}, time={:?}. Speak in a {:?} \
             register at {:?} energy.\n",
            classification.topic.name(),
            classification.mood,
            classification.time_of_day,
            state.primary,
            state.energy,
        ));
        if !context.is_empty() {
            prompt.push('\n');
            prompt.push_str(context);
        }
        prompt
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{
        Emotion, GenerationReply, ProposedToolCall, TopicType, Urgency,
    };
    use crate::engine::emotion::FixedRandom;
    use crate::engine::memory::{InMemoryRepository, MemoryStore};
    use crate::engine::profile::{InMemoryProfiles, ProfileAggregator};
    use crate::engine::providers::MockGeneration;
    use serde_json::json;

    fn engine_with(generation: Arc<dyn GenerationClient>) -> TurnEngine {
        TurnEngine::new(
            EngineConfig::default(),
            MemoryStore::new(Arc::new(InMemoryRepository::new())),
            ProfileAggregator::new(Arc::new(InMemoryProfiles::new())),
            generation,
        )
    }

    #[tokio::test]
    async fn hello_on_empty_session_uses_all_defaults() {
        let engine = engine_with(Arc::new(MockGeneration::with_text("Namaste! Welcome.")));
        let out = engine.handle_turn("s1", "hello", None).await.unwrap();

        assert_eq!(out.reply, "Namaste! Welcome.");
        assert!(!out.fallback_used);
        assert_eq!(out.classification.topic, TopicType::Practical);
        assert_eq!(out.classification.urgency, Urgency::Low);
        // Practical topic default register.
        assert_eq!(out.emotional_state, EmotionalState::default());
        assert!(out.autonomous_actions.is_empty());
        assert!(out.goal.is_none());
        assert!(out.audio.is_none());

        // A default profile was created and the turn was remembered.
        assert!(engine.profiles.profile("s1").unwrap().is_some());
        let entries = engine.memory.session_entries("s1").unwrap();
        assert_eq!(entries.len(), 1);
        assert!((entries[0].importance - 0.3).abs() < f32::EPSILON);
        assert_eq!(entries[0].response, "Namaste! Welcome.");
    }

    #[tokio::test]
    async fn generation_failure_returns_branded_fallback() {
        let engine = engine_with(Arc::new(MockGeneration::failing()));
        let out = engine.handle_turn("s1", "hello", None).await.unwrap();

        assert!(out.fallback_used);
        assert_eq!(out.reply, EngineConfig::default().fallback_reply);
        assert!(!out.reply.is_empty());
        assert!((out.confidence - 0.3).abs() < f32::EPSILON);
        assert!(out.autonomous_actions.is_empty());
        assert!(out.goal.is_none());
        assert!(out.next_steps.is_empty());

        // The turn is still recorded, with the fallback as the response.
        let entries = engine.memory.session_entries("s1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].response, out.reply);
    }

    #[tokio::test]
    async fn urgent_booking_executes_proposed_tool() {
        let reply = GenerationReply {
            text: "On it — checking hotels now.".into(),
            tool_calls: vec![ProposedToolCall {
                name: "search_hotels".into(),
                arguments: json!({ "area": "Godowlia" }),
            }],
        };
        let engine = engine_with(Arc::new(MockGeneration::with_reply(reply)));
        let out = engine
            .handle_turn("s1", "URGENT please book a hotel for tonight, I need it ASAP", None)
            .await
            .unwrap();

        assert_eq!(out.classification.urgency, Urgency::Critical);
        assert!(out.classification.requires_autonomy);
        assert_eq!(out.autonomous_actions.len(), 1);
        let action = &out.autonomous_actions[0];
        assert_eq!(action.action, "search_hotels");
        assert!(action.executed, "reason={}", action.reason);
        assert!(out.goal.is_some());
    }

    #[tokio::test]
    async fn low_urgency_proposed_tools_are_ignored() {
        let reply = GenerationReply {
            text: "Here are some thoughts.".into(),
            tool_calls: vec![ProposedToolCall {
                name: "search_hotels".into(),
                arguments: json!({ "area": "Chowk" }),
            }],
        };
        let engine = engine_with(Arc::new(MockGeneration::with_reply(reply)));
        let out = engine
            .handle_turn("s1", "maybe a hotel sometime", None)
            .await
            .unwrap();

        assert_eq!(out.classification.urgency, Urgency::Low);
        assert!(out.autonomous_actions.is_empty(), "no tool may run below the gate");
    }

    #[tokio::test]
    async fn speech_markup_carries_emotional_pauses() {
        let engine = engine_with(Arc::new(MockGeneration::with_text(
            "The river is sacred. Walk gently.",
        )));
        let out = engine
            .handle_turn("s1", "tell me about the ghats", Some("Assi Ghat"))
            .await
            .unwrap();

        assert_eq!(out.emotional_state.primary, Emotion::Reverent);
        assert!(out.speech_markup.contains("<emphasis>sacred</emphasis>"), "{}", out.speech_markup);
        assert!(out.speech_markup.contains("800ms"), "{}", out.speech_markup);
        // The plain reply stays clean for text rendering.
        assert!(!out.reply.contains("<emphasis>"));
    }

    #[tokio::test]
    async fn phrase_variation_prefixes_speech_only() {
        let mut config = EngineConfig::default();
        config.phrase_variation = true;
        let engine = TurnEngine::new(
            config,
            MemoryStore::new(Arc::new(InMemoryRepository::new())),
            ProfileAggregator::new(Arc::new(InMemoryProfiles::new())),
            Arc::new(MockGeneration::with_text("Certainly.")),
        )
        .with_random(Arc::new(FixedRandom(0)));

        let a = engine.handle_turn("s1", "hello", None).await.unwrap();
        let b = engine.handle_turn("s1", "hello", None).await.unwrap();
        assert_eq!(a.speech_markup, b.speech_markup, "fixed source must be stable");
        assert_eq!(a.reply, "Certainly.");
        assert_ne!(a.speech_markup, a.reply);
    }

    #[tokio::test]
    async fn missing_session_id_is_rejected() {
        let engine = engine_with(Arc::new(MockGeneration::with_text("hi")));
        let err = engine.handle_turn("  ", "hello", None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidEntry(_)), "got {err}");
    }

    #[tokio::test]
    async fn profile_accumulates_across_turns() {
        let engine = engine_with(Arc::new(MockGeneration::with_text("Noted.")));
        engine
            .handle_turn("s1", "I love spicy street food", None)
            .await
            .unwrap();
        engine
            .handle_turn("s1", "traveling solo this time", None)
            .await
            .unwrap();

        let profile = engine.profiles.profile("s1").unwrap().unwrap();
        assert!(profile.preferences.spice_level.is_some());
        assert!(profile.preferences.group_size.is_some());
        assert_eq!(engine.memory.entry_count("s1").unwrap(), 2);
    }
}

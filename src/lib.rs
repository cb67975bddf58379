// Sarathi Core — session personalization & memory engine
// The engine behind the Sarathi tour-guide assistant: classifies each
// incoming message, scores and retrieves conversation memories, maintains
// a per-session traveler profile, derives the emotional tone of the reply,
// and orchestrates autonomous tool calls under urgency.
//
// Layering rules:
//   atoms/  — pure data types, constants, the canonical error enum.
//             No I/O, no side effects, no imports from engine/.
//   engine/ — all behavior, one module per concern.
//
// Transport channels, page rendering, and the generation/speech backends
// themselves live outside this crate; the engine talks to them through the
// collaborator traits in engine::providers and engine::voice.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::types::*;
pub use engine::classifier;
pub use engine::config::EngineConfig;
pub use engine::emotion;
pub use engine::memory::{
    InMemoryRepository, MemoryRepository, MemoryStore, RetentionPolicy, SqliteStore,
};
pub use engine::orchestrator::{Orchestrator, OrchestratorOutcome};
pub use engine::profile::{InMemoryProfiles, ProfileAggregator, ProfileRepository};
pub use engine::providers::{GenerationClient, HttpGeneration, MockGeneration};
pub use engine::tools::{ToolDispatcher, ToolHandler};
pub use engine::turn::TurnEngine;
pub use engine::voice::{HttpVoice, NullVoice, VoiceClient};

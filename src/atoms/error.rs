// ── Sarathi Atoms: Error Types ─────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, DB, Generation, Tool…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • Generation and tool failures are normally absorbed before they reach a
//     caller: the turn pipeline substitutes the branded fallback reply and the
//     orchestrator records failed tool calls as unexecuted actions. The
//     variants exist so those layers have something typed to log and match on.
//   • No variant carries secret material (API keys) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// SQLite / rusqlite database failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A memory candidate was rejected before any mutation (missing
    /// session id or empty message).
    #[error("Invalid memory entry: {0}")]
    InvalidEntry(String),

    /// Generation backend failure: missing credentials, transport error, or
    /// an unusable response. Callers substitute the fallback reply.
    #[error("Generation error: {provider}: {message}")]
    Generation { provider: String, message: String },

    /// Tool execution failure. Caught per invocation and recorded as an
    /// unexecuted action; never aborts sibling tools.
    #[error("Tool error: {tool}: {message}")]
    Tool { tool: String, message: String },

    /// Engine configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a generation error with provider name and message.
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { provider: provider.into(), message: message.into() }
    }

    /// Create a tool error with tool name and message.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool { tool: tool.into(), message: message.into() }
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;

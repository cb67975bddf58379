// ── Sarathi Atoms: Constants ───────────────────────────────────────────────
// All named tuning constants for the engine live here.
// Rationale: collecting constants in one place eliminates magic numbers and
// makes the retention/scoring behavior auditable at a glance.

// ── Memory retention ───────────────────────────────────────────────────────
// After each append, a session whose entry count exceeds SESSION_MAX_ENTRIES
// is pruned down to the union of {importance > RETENTION_IMPORTANCE_FLOOR}
// and the PRUNE_KEEP_RECENT most recent entries. High-importance entries are
// never dropped, regardless of age.
pub const SESSION_MAX_ENTRIES: usize = 50;
pub const PRUNE_KEEP_RECENT: usize = 30;
pub const RETENTION_IMPORTANCE_FLOOR: f32 = 0.7;

// ── Retrieval scoring ──────────────────────────────────────────────────────
// score = keyword_overlap + IMPORTANCE_WEIGHT × importance + recency bonus.
pub const IMPORTANCE_WEIGHT: f32 = 2.0;
pub const RECENCY_BONUS_HOUR: f32 = 1.0;
pub const RECENCY_BONUS_DAY: f32 = 0.5;

// ── Importance scoring ─────────────────────────────────────────────────────
pub const IMPORTANCE_BASE: f32 = 0.3;
pub const SENTIMENT_BONUS_POSITIVE: f32 = 0.2;
pub const SENTIMENT_BONUS_NEGATIVE: f32 = 0.3;
pub const LENGTH_BONUS: f32 = 0.1;
pub const LONG_MESSAGE_CHARS: usize = 100;
pub const PREFERENCE_BONUS: f32 = 0.3;

// ── Embeddings ─────────────────────────────────────────────────────────────
// Fixed-size bag-of-words hash vector, L2-normalized. Stored on every entry;
// the retrieval scorer currently ranks by keyword overlap instead (see
// DESIGN.md), so the vector is retained for a future cosine path.
pub const EMBEDDING_DIM: usize = 384;

// ── Classification thresholds ──────────────────────────────────────────────
pub const COMPLEX_WORD_COUNT: usize = 20;
pub const MODERATE_WORD_COUNT: usize = 10;

// ── Context assembly ───────────────────────────────────────────────────────
// How many retrieved memories go into the personalized prompt section.
pub const CONTEXT_MEMORY_LIMIT: usize = 3;

// ── Orchestrator confidence ────────────────────────────────────────────────
pub const CONFIDENCE_BASE: f32 = 0.5;
pub const CONFIDENCE_TOOL_EXECUTED: f32 = 0.2;
pub const CONFIDENCE_LOCATION: f32 = 0.1;
pub const CONFIDENCE_SIMPLE: f32 = 0.1;
pub const CONFIDENCE_LOW_URGENCY: f32 = 0.1;
pub const CONFIDENCE_FALLBACK: f32 = 0.3;

// ── Branded fallback reply ─────────────────────────────────────────────────
// Returned verbatim when the generation backend is unreachable or has no
// credentials. Must never be empty: the end user never sees a raw error.
pub const FALLBACK_REPLY: &str = "I'm having a little trouble reaching my \
guide's notebook right now. Please ask me again in a moment — I'm still \
here with you.";

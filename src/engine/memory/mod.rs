// ── Sarathi Engine: Memory Subsystem ───────────────────────────────────────
//
// Per-session ordered conversation memory with heuristic scoring:
//   scoring — sentiment, importance, and the bag-of-words hash embedding
//   store   — the repository trait, the in-memory backend, and MemoryStore
//             (validate → score → embed → append → prune, plus retrieval)
//   sqlite  — durable backend implementing the same repository trait
//
// The repository is injected into MemoryStore; there is no module-level
// singleton. One store instance per process/application context.

pub mod scoring;
pub mod sqlite;
pub mod store;

pub use scoring::{embedding_of, importance_of, sentiment_of};
pub use sqlite::SqliteStore;
pub use store::{InMemoryRepository, MemoryRepository, MemoryStore, RetentionPolicy};

// ── Sarathi Engine: Memory Store ───────────────────────────────────────────
//
// The conversation memory store: validates candidates, runs the scoring
// pipeline, appends to the session's ordered entry list, prunes by the
// retention policy, and ranks entries for retrieval.
//
// Storage is behind the `MemoryRepository` trait and injected — one store
// instance per application context, never a module-level singleton. The
// in-memory backend covers single-node deployments; `SqliteStore` (sibling
// module) is the durable backend behind the same trait.
//
// Retention policy: after each append, a session holding more than
// SESSION_MAX_ENTRIES keeps the union of {importance > floor} and the
// PRUNE_KEEP_RECENT most recent entries, de-duplicated by id, in
// chronological order. High-importance entries therefore survive forever.
//
// Retrieval: score = keyword overlap + 2 × importance + recency bonus,
// stable-sorted so ties keep insertion order. The stored embedding is not
// consulted here (see DESIGN.md).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use parking_lot::RwLock;

use crate::atoms::constants::{
    IMPORTANCE_WEIGHT, PRUNE_KEEP_RECENT, RECENCY_BONUS_DAY, RECENCY_BONUS_HOUR,
    RETENTION_IMPORTANCE_FLOOR, SESSION_MAX_ENTRIES,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{EntryContext, MemoryCandidate, MemoryEntry};
use crate::engine::memory::scoring::{embedding_of, importance_of, sentiment_of};

// ═══════════════════════════════════════════════════════════════════════════
// Repository Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Session-keyed storage for memory entries. Implementations must keep each
/// session's entries in insertion (chronological) order.
pub trait MemoryRepository: Send + Sync {
    fn append(&self, entry: MemoryEntry) -> EngineResult<()>;
    fn session_entries(&self, session_id: &str) -> EngineResult<Vec<MemoryEntry>>;
    /// Atomically replace a session's entry list (used by pruning).
    fn replace_session(&self, session_id: &str, entries: Vec<MemoryEntry>) -> EngineResult<()>;
    fn entry_count(&self, session_id: &str) -> EngineResult<usize>;
}

/// Single-node backend: a concurrent map of session → ordered entries.
#[derive(Default)]
pub struct InMemoryRepository {
    sessions: RwLock<HashMap<String, Vec<MemoryEntry>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryRepository for InMemoryRepository {
    fn append(&self, entry: MemoryEntry) -> EngineResult<()> {
        let mut sessions = self.sessions.write();
        sessions.entry(entry.session_id.clone()).or_default().push(entry);
        Ok(())
    }

    fn session_entries(&self, session_id: &str) -> EngineResult<Vec<MemoryEntry>> {
        Ok(self.sessions.read().get(session_id).cloned().unwrap_or_default())
    }

    fn replace_session(&self, session_id: &str, entries: Vec<MemoryEntry>) -> EngineResult<()> {
        self.sessions.write().insert(session_id.to_string(), entries);
        Ok(())
    }

    fn entry_count(&self, session_id: &str) -> EngineResult<usize> {
        Ok(self.sessions.read().get(session_id).map(Vec::len).unwrap_or(0))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Memory Store
// ═══════════════════════════════════════════════════════════════════════════

/// Retention tuning; defaults come from atoms::constants.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub max_entries: usize,
    pub keep_recent: usize,
    pub importance_floor: f32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_entries: SESSION_MAX_ENTRIES,
            keep_recent: PRUNE_KEEP_RECENT,
            importance_floor: RETENTION_IMPORTANCE_FLOOR,
        }
    }
}

pub struct MemoryStore {
    repo: Arc<dyn MemoryRepository>,
    policy: RetentionPolicy,
}

impl MemoryStore {
    pub fn new(repo: Arc<dyn MemoryRepository>) -> Self {
        Self { repo, policy: RetentionPolicy::default() }
    }

    pub fn with_policy(repo: Arc<dyn MemoryRepository>, policy: RetentionPolicy) -> Self {
        Self { repo, policy }
    }

    /// Validate, score, embed, append, prune. Side-effect only.
    /// Fails with `InvalidEntry` on malformed candidates, before any mutation.
    pub fn append(&self, candidate: MemoryCandidate) -> EngineResult<()> {
        if candidate.session_id.trim().is_empty() {
            return Err(EngineError::InvalidEntry("missing session id".into()));
        }
        if candidate.user_message.trim().is_empty() {
            return Err(EngineError::InvalidEntry("empty user message".into()));
        }

        let sentiment = sentiment_of(&candidate.user_message);
        let importance = importance_of(&candidate.user_message, sentiment);
        let embedding = embedding_of(&candidate.user_message);

        let interests = match crate::engine::classifier::topic_keyword_match(
            &candidate.user_message.to_lowercase(),
        ) {
            Some(topic) => vec![topic.name().to_string()],
            None => Vec::new(),
        };

        let entry = MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: candidate.session_id.clone(),
            user_message: candidate.user_message,
            response: candidate.response,
            timestamp: candidate.timestamp.unwrap_or_else(Utc::now),
            context: EntryContext {
                location: candidate.location,
                mood: candidate.mood,
                topic: candidate.topic,
                sentiment,
                interests,
            },
            embedding,
            importance,
        };

        debug!(
            "[memory] append session={} importance={:.2} topic={}",
            entry.session_id,
            entry.importance,
            entry.context.topic.name()
        );

        self.repo.append(entry)?;
        self.prune(&candidate.session_id)?;
        Ok(())
    }

    /// Rank a session's entries for a query and return the top `limit`.
    pub fn retrieve(
        &self,
        session_id: &str,
        query: &str,
        limit: usize,
    ) -> EngineResult<Vec<MemoryEntry>> {
        let entries = self.repo.session_entries(session_id)?;
        let query_words: HashSet<String> =
            query.to_lowercase().split_whitespace().map(str::to_string).collect();
        let now = Utc::now();

        let mut scored: Vec<(MemoryEntry, f32)> = entries
            .into_iter()
            .map(|e| {
                let score = relevance_score(&e, &query_words, now);
                (e, score)
            })
            .collect();

        // sort_by is stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(e, _)| e).collect())
    }

    pub fn session_entries(&self, session_id: &str) -> EngineResult<Vec<MemoryEntry>> {
        self.repo.session_entries(session_id)
    }

    pub fn entry_count(&self, session_id: &str) -> EngineResult<usize> {
        self.repo.entry_count(session_id)
    }

    /// Apply the retention policy to one session.
    fn prune(&self, session_id: &str) -> EngineResult<()> {
        let entries = self.repo.session_entries(session_id)?;
        if entries.len() <= self.policy.max_entries {
            return Ok(());
        }

        let recent_cutoff = entries.len().saturating_sub(self.policy.keep_recent);
        let mut keep_ids: HashSet<String> = HashSet::new();
        for (i, e) in entries.iter().enumerate() {
            if e.importance > self.policy.importance_floor || i >= recent_cutoff {
                keep_ids.insert(e.id.clone());
            }
        }

        let before = entries.len();
        let retained: Vec<MemoryEntry> =
            entries.into_iter().filter(|e| keep_ids.contains(&e.id)).collect();
        info!(
            "[memory] pruned session={} {} → {} entries",
            session_id,
            before,
            retained.len()
        );
        self.repo.replace_session(session_id, retained)
    }
}

/// keyword overlap count + 2 × importance + recency bonus.
fn relevance_score(
    entry: &MemoryEntry,
    query_words: &HashSet<String>,
    now: chrono::DateTime<Utc>,
) -> f32 {
    let entry_text = format!("{} {}", entry.user_message, entry.response).to_lowercase();
    let entry_words: HashSet<&str> = entry_text.split_whitespace().collect();
    let overlap = query_words.iter().filter(|w| entry_words.contains(w.as_str())).count() as f32;

    let age = now.signed_duration_since(entry.timestamp);
    let recency = if age < chrono::Duration::hours(1) {
        RECENCY_BONUS_HOUR
    } else if age < chrono::Duration::hours(24) {
        RECENCY_BONUS_DAY
    } else {
        0.0
    };

    overlap + IMPORTANCE_WEIGHT * entry.importance + recency
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

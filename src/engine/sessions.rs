// ── Sarathi Engine: Session Serialization ──────────────────────────────────
//
// Memory appends and profile updates are read-modify-write over session-keyed
// state, so two turns of the same session must never interleave. This module
// hands out one async mutex per session id; the turn pipeline holds it for
// the whole turn. Turns of different sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Keyed registry of per-session locks.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a session. The caller awaits
    /// `.lock()` on the returned handle; the registry's own mutex is only
    /// held long enough to clone the Arc.
    pub fn acquire(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(session_id.to_string()).or_default().clone()
    }

    /// Number of sessions seen so far (locks are never reclaimed; session
    /// ids are few and small).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

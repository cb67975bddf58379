// ── Sarathi Engine: SQLite Store ───────────────────────────────────────────
//
// Durable backend for memory entries and traveler profiles, behind the same
// repository traits as the in-memory backend. Uses its own connection with
// WAL mode; tables are created on open. Embeddings are stored as
// little-endian f32 BLOBs; entry context and profiles as JSON text columns.

use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::atoms::error::EngineResult;
use crate::atoms::types::{EntryContext, MemoryEntry, UserProfile};
use crate::engine::memory::store::MemoryRepository;
use crate::engine::profile::ProfileRepository;

/// Thread-safe database wrapper. One instance per application context.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and initialize tables.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("[memory] opening sqlite store at {:?}", path.as_ref());
        Self::init(conn)
    }

    /// Fully in-memory database, used by tests.
    pub fn open_in_memory() -> EngineResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> EngineResult<Self> {
        // WAL improves concurrent read behavior; harmless for :memory:.
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS memory_entries (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                user_message TEXT NOT NULL,
                response TEXT NOT NULL DEFAULT '',
                timestamp TEXT NOT NULL,
                context_json TEXT NOT NULL DEFAULT '{}',
                embedding BLOB,
                importance REAL NOT NULL DEFAULT 0.3,
                seq INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_entries_session
                ON memory_entries(session_id, seq);

            CREATE TABLE IF NOT EXISTS profiles (
                session_id TEXT PRIMARY KEY,
                profile_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        ",
        )?;

        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    fn next_seq(conn: &Connection, session_id: &str) -> EngineResult<i64> {
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(seq) FROM memory_entries WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(MemoryEntry, String)> {
        let id: String = row.get(0)?;
        let session_id: String = row.get(1)?;
        let user_message: String = row.get(2)?;
        let response: String = row.get(3)?;
        let timestamp: String = row.get(4)?;
        let context_json: String = row.get(5)?;
        let embedding: Vec<u8> = row.get::<_, Option<Vec<u8>>>(6)?.unwrap_or_default();
        let importance: f64 = row.get(7)?;

        let entry = MemoryEntry {
            id,
            session_id,
            user_message,
            response,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            context: EntryContext::default(),
            embedding: bytes_to_f32_vec(&embedding),
            importance: importance as f32,
        };
        Ok((entry, context_json))
    }
}

impl MemoryRepository for SqliteStore {
    fn append(&self, entry: MemoryEntry) -> EngineResult<()> {
        let conn = self.conn.lock();
        let seq = Self::next_seq(&conn, &entry.session_id)?;
        conn.execute(
            "INSERT INTO memory_entries
               (id, session_id, user_message, response, timestamp, context_json,
                embedding, importance, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id,
                entry.session_id,
                entry.user_message,
                entry.response,
                entry.timestamp.to_rfc3339(),
                serde_json::to_string(&entry.context)?,
                f32_vec_to_bytes(&entry.embedding),
                entry.importance as f64,
                seq,
            ],
        )?;
        Ok(())
    }

    fn session_entries(&self, session_id: &str) -> EngineResult<Vec<MemoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, user_message, response, timestamp, context_json,
                    embedding, importance
             FROM memory_entries WHERE session_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![session_id], Self::row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            let (mut entry, context_json) = row?;
            entry.context = serde_json::from_str(&context_json)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn replace_session(&self, session_id: &str, entries: Vec<MemoryEntry>) -> EngineResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM memory_entries WHERE session_id = ?1", params![session_id])?;
        for (i, entry) in entries.iter().enumerate() {
            tx.execute(
                "INSERT INTO memory_entries
                   (id, session_id, user_message, response, timestamp, context_json,
                    embedding, importance, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    entry.id,
                    entry.session_id,
                    entry.user_message,
                    entry.response,
                    entry.timestamp.to_rfc3339(),
                    serde_json::to_string(&entry.context)?,
                    f32_vec_to_bytes(&entry.embedding),
                    entry.importance as f64,
                    (i + 1) as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn entry_count(&self, session_id: &str) -> EngineResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memory_entries WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ProfileRepository for SqliteStore {
    fn load(&self, session_id: &str) -> EngineResult<Option<UserProfile>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT profile_json FROM profiles WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }

    fn save(&self, profile: &UserProfile) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO profiles (session_id, profile_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET
               profile_json = excluded.profile_json,
               updated_at = excluded.updated_at",
            params![
                profile.session_id,
                serde_json::to_string(profile)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

// ── BLOB helpers ───────────────────────────────────────────────────────────

/// Convert a Vec<f32> to bytes for SQLite BLOB storage.
pub fn f32_vec_to_bytes(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{EntryContext, Sentiment, TopicType, UserMood};

    fn entry(session: &str, msg: &str, importance: f32) -> MemoryEntry {
        MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.into(),
            user_message: msg.into(),
            response: "ok".into(),
            timestamp: Utc::now(),
            context: EntryContext {
                location: Some("Assi Ghat".into()),
                mood: UserMood::Curious,
                topic: TopicType::Spiritual,
                sentiment: Sentiment::Neutral,
                interests: vec!["spiritual".into()],
            },
            embedding: vec![0.5, 0.5, 0.0],
            importance,
        }
    }

    #[test]
    fn round_trips_entries_in_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.append(entry("s1", "first", 0.3)).unwrap();
        store.append(entry("s1", "second", 0.9)).unwrap();

        let entries = store.session_entries("s1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_message, "first");
        assert_eq!(entries[1].user_message, "second");
        assert_eq!(entries[1].context.location.as_deref(), Some("Assi Ghat"));
        assert!((entries[1].importance - 0.9).abs() < 1e-6);
        assert_eq!(entries[0].embedding, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn replace_session_swaps_contents() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.append(entry("s1", "a", 0.3)).unwrap();
        store.append(entry("s1", "b", 0.3)).unwrap();

        let kept = vec![entry("s1", "only", 0.8)];
        store.replace_session("s1", kept).unwrap();

        let entries = store.session_entries("s1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_message, "only");
        assert_eq!(store.entry_count("s1").unwrap(), 1);
    }

    #[test]
    fn profile_round_trip_and_upsert() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load("s1").unwrap().is_none());

        let mut profile = UserProfile::new("s1");
        profile.visited_places.push("Sarnath".into());
        store.save(&profile).unwrap();

        let loaded = store.load("s1").unwrap().expect("profile should exist");
        assert_eq!(loaded.visited_places, vec!["Sarnath".to_string()]);

        profile.conversation_style.enjoys_stories = true;
        store.save(&profile).unwrap();
        let loaded = store.load("s1").unwrap().unwrap();
        assert!(loaded.conversation_style.enjoys_stories);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sarathi.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(entry("s1", "durable", 0.5)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let entries = store.session_entries("s1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_message, "durable");
    }
}

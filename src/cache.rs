use crate::api::models::Conversation;
use crate::error::CacheError;
use directories::ProjectDirs;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "coachdesk", "Coachdesk")?;
    Some(proj.data_dir().join("cache.sqlite"))
}

// Caching conversations so the list renders before the backend answers.
pub struct ConversationCache {
    conn: Mutex<Connection>,
}

impl ConversationCache {
    pub fn open_default() -> Result<Self, CacheError> {
        let path = db_path().ok_or(CacheError::NoDataDir)?;
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                coach_id TEXT NOT NULL,
                client_id TEXT NOT NULL,
                last_activity TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                raw_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS conversations_activity
                ON conversations (last_activity DESC);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Stores `conversations`, leaving rows whose content is unchanged alone.
    /// Returns how many rows were inserted or rewritten.
    pub fn upsert(&self, conversations: &[Conversation]) -> Result<usize, CacheError> {
        let now = chrono::Utc::now().timestamp();
        let mut conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let tx = conn.transaction()?;
        let mut written = 0;
        for c in conversations {
            let raw = serde_json::to_string(c)?;
            written += tx.execute(
                r#"
                INSERT INTO conversations (id, coach_id, client_id, last_activity, updated_at, raw_json)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    coach_id=excluded.coach_id,
                    client_id=excluded.client_id,
                    last_activity=excluded.last_activity,
                    updated_at=excluded.updated_at,
                    raw_json=excluded.raw_json
                WHERE conversations.raw_json <> excluded.raw_json
                "#,
                params![c.id, c.coach_id, c.client_id, c.last_activity(), now, raw],
            )?;
        }
        tx.commit()?;
        Ok(written)
    }

    /// Conversations involving `user_id`, most recent activity first.
    pub fn conversations_for(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT raw_json FROM conversations
             WHERE coach_id = ?1 OR client_id = ?1
             ORDER BY last_activity DESC, id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for raw in rows {
            let raw = raw?;
            match serde_json::from_str::<Conversation>(&raw) {
                Ok(conv) => out.push(conv),
                Err(err) => log::warn!("Dropping unreadable cached conversation: {err}"),
            }
        }
        Ok(out)
    }
}

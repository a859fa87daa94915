use crate::error::HistoryError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{info, warn};

const HISTORY_KEY: &str = "queryHistory";

/// Previously looked-up inputs, oldest first, without duplicates.
///
/// Persisted as a JSON string list under a single key in a small SQLite
/// key/value table. The whole list is rewritten on every append.
pub struct History {
    conn: Connection,
    entries: Vec<String>,
}

impl History {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, HistoryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        let stored: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?", [HISTORY_KEY], |row| row.get(0))
            .optional()?;

        let entries = match stored {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Discarding unreadable query history: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        info!("Loaded {} history entries", entries.len());

        Ok(Self { conn, entries })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Appends `query` unless the exact same string is already stored.
    /// Returns whether anything was written. On error the in-memory list is
    /// left unchanged so a later append can retry.
    pub fn append(&mut self, query: &str) -> Result<bool, HistoryError> {
        if self.entries.iter().any(|e| e == query) {
            return Ok(false);
        }
        let mut updated = self.entries.clone();
        updated.push(query.to_string());

        let json = serde_json::to_string(&updated)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![HISTORY_KEY, json],
        )?;
        self.entries = updated;
        Ok(true)
    }
}

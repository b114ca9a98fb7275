//! Journal entries, keyed by the writer's email.
//!
//! Entries are created once; the only later mutation is attaching an AI
//! insight.

use crate::dispatcher::{DispatchRequest, Dispatcher};
use crate::error::ProviderError;
use crate::logging;
use crate::personas::Feature;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

/// Persona used for insights when the entry names none.
pub const DEFAULT_INSIGHT_PERSONA: &str = "socrates";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub email: String,
    pub content: String,
    pub philosopher_id: Option<String>,
    pub ai_insight: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct JournalStore {
    conn: Mutex<Connection>,
}

impl JournalStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                content TEXT NOT NULL,
                philosopher_id TEXT,
                ai_insight TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_journal_entries_email
                ON journal_entries (email, created_at);
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn)
    }

    pub fn create_entry(&self, email: &str, content: &str, philosopher_id: Option<&str>) -> Result<JournalEntry> {
        let now = Utc::now().to_rfc3339();
        let entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            content: content.to_string(),
            philosopher_id: philosopher_id.map(|s| s.to_string()),
            ai_insight: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO journal_entries (id, email, content, philosopher_id, ai_insight, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
                params![
                    entry.id,
                    entry.email,
                    entry.content,
                    entry.philosopher_id,
                    entry.created_at,
                    entry.updated_at
                ],
            )?;
            Ok(())
        })?;

        logging::log_journal(&format!("Created entry {}", entry.id));
        Ok(entry)
    }

    /// Entries for one writer, newest first.
    pub fn list_entries(&self, email: &str) -> Result<Vec<JournalEntry>> {
        let email = normalize_email(email);
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, content, philosopher_id, ai_insight, created_at, updated_at
                 FROM journal_entries
                 WHERE email = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let entries = stmt.query_map([email], entry_from_row)?;
            entries.collect()
        })
    }

    pub fn get_entry(&self, id: &str, email: &str) -> Result<Option<JournalEntry>> {
        let email = normalize_email(email);
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, email, content, philosopher_id, ai_insight, created_at, updated_at
                 FROM journal_entries
                 WHERE id = ?1 AND email = ?2",
                params![id, email],
                entry_from_row,
            )
            .optional()
        })
    }

    /// Attach an insight. `None` when the entry doesn't exist for this email.
    pub fn attach_insight(&self, id: &str, email: &str, insight: &str) -> Result<Option<JournalEntry>> {
        let now = Utc::now().to_rfc3339();
        let changed = self.with_connection(|conn| {
            conn.execute(
                "UPDATE journal_entries SET ai_insight = ?1, updated_at = ?2 WHERE id = ?3 AND email = ?4",
                params![insight, now, id, normalize_email(email)],
            )
        })?;

        if changed == 0 {
            return Ok(None);
        }
        logging::log_journal(&format!("Attached insight to entry {}", id));
        self.get_entry(id, email)
    }

    /// Returns whether an entry was deleted.
    pub fn delete_entry(&self, id: &str, email: &str) -> Result<bool> {
        let deleted = self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM journal_entries WHERE id = ?1 AND email = ?2",
                params![id, normalize_email(email)],
            )
        })?;
        if deleted > 0 {
            logging::log_journal(&format!("Deleted entry {}", id));
        }
        Ok(deleted > 0)
    }
}

fn entry_from_row(row: &Row<'_>) -> Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        email: row.get(1)?,
        content: row.get(2)?,
        philosopher_id: row.get(3)?,
        ai_insight: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Ask the entry's philosopher (or the default) for a short reflection.
pub async fn generate_insight(
    dispatcher: &Dispatcher,
    entry: &JournalEntry,
    philosopher_id: Option<&str>,
) -> std::result::Result<String, ProviderError> {
    let persona_id = philosopher_id
        .or(entry.philosopher_id.as_deref())
        .unwrap_or(DEFAULT_INSIGHT_PERSONA);

    let request = DispatchRequest {
        persona_id: persona_id.to_string(),
        user_text: format!("Here is my journal entry:\n\n{}", entry.content),
        history: Vec::new(),
        user_context: String::new(),
        feature: Feature::Journal,
    };

    dispatcher.send_message(&request).await.map(|reply| reply.text)
}

use std::path::Path;

use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};

use crate::entity::Note;
use crate::error::{LessonNoteError, Result};
use crate::search::SearchFilter;

const CACHE_DB: &str = "cache.db";
const DEFAULT_LIMIT: usize = 50;

/// SQLite cache for note search.
///
/// Title and content are stored lowercased next to the originals so the
/// substring match is case-insensitive for any script, not just ASCII.
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Open or create the cache database in the data directory
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CACHE_DB);
        let cache = Self {
            conn: Connection::open(&path)?,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// A cache that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let cache = Self {
            conn: Connection::open_in_memory()?,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                lesson_id TEXT,
                topic_id TEXT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                title_folded TEXT NOT NULL,
                content_folded TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id);

            CREATE TABLE IF NOT EXISTS note_tags (
                note_id TEXT NOT NULL,
                tag_id TEXT NOT NULL,
                PRIMARY KEY (note_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);
            ",
        )?;
        Ok(())
    }

    /// Get the store version the cache was last built from
    pub fn get_store_version(&self) -> Result<Option<String>> {
        let result: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'store_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    pub fn set_store_version(&self, version: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('store_version', ?1)",
            [version],
        )?;
        Ok(())
    }

    /// Index a note and its tag links
    pub fn index_note(&self, note: &Note) -> Result<()> {
        let id = note.id.to_string();

        self.conn.execute(
            "INSERT OR REPLACE INTO notes
             (id, user_id, lesson_id, topic_id, title, content, title_folded, content_folded, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                note.user_id,
                note.lesson_id,
                note.topic_id,
                note.title,
                note.content,
                note.title.to_lowercase(),
                note.content.to_lowercase(),
                note.created_at.to_rfc3339(),
                note.updated_at.to_rfc3339(),
            ],
        )?;

        self.conn
            .execute("DELETE FROM note_tags WHERE note_id = ?1", [&id])?;
        for tag in &note.tags {
            self.conn.execute(
                "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2)",
                [&id, tag],
            )?;
        }

        Ok(())
    }

    pub fn remove_note(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])?;
        self.conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Clear all cached data (for full rebuild)
    pub fn clear(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM note_tags; DELETE FROM notes; DELETE FROM meta;",
        )?;
        Ok(())
    }

    /// Search one user's notes.
    ///
    /// Same predicate as [`crate::search::search_notes`]; results are ordered
    /// by most recent update and capped at `limit` (50 when `None`).
    pub fn search_notes(
        &self,
        user_id: &str,
        query: &str,
        filter: &SearchFilter,
        limit: Option<usize>,
    ) -> Result<Vec<NoteHit>> {
        let mut sql = String::from(
            "SELECT n.id, n.title, n.topic_id, n.lesson_id, n.updated_at, n.content
             FROM notes n
             WHERE n.user_id = ?",
        );
        let mut args: Vec<Value> = vec![Value::Text(user_id.to_string())];

        let needle = query.trim().to_lowercase();
        if !needle.is_empty() {
            sql.push_str(" AND (instr(n.title_folded, ?) > 0 OR instr(n.content_folded, ?) > 0)");
            args.push(Value::Text(needle.clone()));
            args.push(Value::Text(needle.clone()));
        }

        if let Some(topic) = &filter.topic_id {
            sql.push_str(" AND n.topic_id = ?");
            args.push(Value::Text(topic.clone()));
        }

        if !filter.tag_ids.is_empty() {
            let placeholders = vec!["?"; filter.tag_ids.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM note_tags t WHERE t.note_id = n.id AND t.tag_id IN ({}))",
                placeholders
            ));
            args.extend(filter.tag_ids.iter().map(|t| Value::Text(t.clone())));
        }

        sql.push_str(" ORDER BY n.updated_at DESC LIMIT ?");
        args.push(Value::Integer(limit.unwrap_or(DEFAULT_LIMIT) as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let results = stmt
            .query_map(params_from_iter(args), |row| {
                let content: String = row.get(5)?;
                Ok(NoteHit {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    topic_id: row.get(2)?,
                    lesson_id: row.get(3)?,
                    updated_at: row.get(4)?,
                    snippet: snippet(&content, &needle),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Number of cached notes
    pub fn note_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Rebuild the cache if the store has changed since the last build.
    /// Returns true if a full reindex was performed.
    pub fn sync_from_store(&self, notes: &[Note], store_version: &str) -> Result<bool> {
        let stored_version = self.get_store_version()?;

        if stored_version.as_deref() == Some(store_version) {
            return Ok(false);
        }

        self.clear()?;
        for note in notes {
            self.index_note(note)?;
        }
        self.set_store_version(store_version)?;
        tracing::debug!(notes = notes.len(), "rebuilt search cache");

        Ok(true)
    }
}

/// One search hit from the cache
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteHit {
    pub id: String,
    pub title: String,
    pub topic_id: Option<String>,
    pub lesson_id: Option<String>,
    pub updated_at: String,
    pub snippet: Option<String>,
}

const SNIPPET_RADIUS: usize = 30;

/// A short window of `content` around the first match of `needle`
fn snippet(content: &str, needle: &str) -> Option<String> {
    if needle.is_empty() {
        return None;
    }

    let chars: Vec<char> = content.chars().collect();
    let folded: Vec<String> = chars.iter().map(|c| c.to_lowercase().collect()).collect();
    let needle_chars: Vec<char> = needle.chars().collect();

    // Walk char positions, comparing the folded text so the window lines up
    // with the original characters
    let position = (0..chars.len()).find(|&start| {
        let mut candidate = String::new();
        let mut i = start;
        while candidate.chars().count() < needle_chars.len() && i < chars.len() {
            candidate.push_str(&folded[i]);
            i += 1;
        }
        candidate.starts_with(needle)
    })?;

    let start = position.saturating_sub(SNIPPET_RADIUS);
    let end = (position + needle_chars.len() + SNIPPET_RADIUS).min(chars.len());
    let mut out: String = chars[start..end].iter().collect();
    out = out.replace('\n', " ");
    if start > 0 {
        out.insert_str(0, "...");
    }
    if end < chars.len() {
        out.push_str("...");
    }
    Some(out)
}

impl From<rusqlite::Error> for LessonNoteError {
    fn from(e: rusqlite::Error) -> Self {
        LessonNoteError::Storage(format!("SQLite error: {}", e))
    }
}

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

use crate::note::{escape_html, now_millis, Language, Note, UNTITLED};

/// Schema version written to `PRAGMA user_version` after the upgrade hook runs
const SCHEMA_VERSION: i32 = 1;

/// Errors surfaced by the persistence gateway
///
/// All four operations fail with this on underlying I/O trouble (corruption,
/// quota, closed connection). Callers surface a transient status message and
/// abandon the write; nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying database failure
    #[error("note store failure: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored column could not be decoded back into a note field
    #[error("corrupt note record (id {id}): {reason}")]
    Corrupt {
        /// Rowid of the unreadable record
        id: i64,
        /// What failed to decode
        reason: String,
    },
}

/// Persistence gateway over a local SQLite note table
///
/// Each operation opens an independent implicit transaction; notes are saved
/// and deleted independently with no cross-note guarantees.
pub struct NoteStore {
    conn: Connection,
}

impl NoteStore {
    /// Open or create the note database at `path`
    ///
    /// The schema upgrade is gated on `PRAGMA user_version`: first run
    /// creates the notes table and the timestamp/language lookup indexes.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the file cannot be opened or the schema
    /// upgrade fails.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self { conn };
        store.upgrade_schema()?;
        Ok(store)
    }

    /// Open an in-memory store (tests and throwaway sessions)
    ///
    /// # Errors
    /// Returns [`StorageError`] if the schema upgrade fails.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.upgrade_schema()?;
        Ok(store)
    }

    fn upgrade_schema(&self) -> Result<(), StorageError> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        info!(from = version, to = SCHEMA_VERSION, "upgrading note schema");
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notes (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                title     TEXT NOT NULL,
                body      TEXT NOT NULL,
                language  TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                tags      TEXT NOT NULL,
                summary   TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_notes_timestamp ON notes(timestamp);
            CREATE INDEX IF NOT EXISTS idx_notes_language ON notes(language);
            PRAGMA user_version = 1;
            ",
        )?;
        Ok(())
    }

    /// Persist a note, assigning an id on first save
    ///
    /// Sanitizes `title`, `text`, and `summary` by HTML-escaping into the
    /// written record, defaults a blank title to "Untitled Note", and stamps
    /// `timestamp` with the current time. Only `id` and `timestamp` are
    /// written back to the passed note: the in-memory copy keeps its raw
    /// text (escaping happens exactly once, at each save), while reads
    /// return the escaped record.
    ///
    /// # Errors
    /// Returns [`StorageError`] on database failure.
    pub fn save(&self, note: &mut Note) -> Result<i64, StorageError> {
        let title = if note.title.trim().is_empty() {
            UNTITLED.to_owned()
        } else {
            escape_html(&note.title)
        };
        let body = escape_html(&note.text);
        let summary = note.summary.as_deref().map(escape_html);
        let timestamp = now_millis();
        let tags = serde_json::to_string(&note.tags).map_err(|e| StorageError::Corrupt {
            id: note.id.unwrap_or(0),
            reason: format!("tags not serializable: {e}"),
        })?;

        let id = if let Some(id) = note.id {
            // Overwrite the record at this id, keeping its key stable.
            self.conn.execute(
                "INSERT OR REPLACE INTO notes (id, title, body, language, timestamp, tags, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, title, body, note.language.as_tag(), timestamp, tags, summary],
            )?;
            id
        } else {
            self.conn.execute(
                "INSERT INTO notes (title, body, language, timestamp, tags, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![title, body, note.language.as_tag(), timestamp, tags, summary],
            )?;
            self.conn.last_insert_rowid()
        };

        note.id = Some(id);
        note.timestamp = timestamp;

        debug!(id, timestamp, "note saved");
        Ok(id)
    }

    /// Fetch a single note by id
    ///
    /// # Errors
    /// Returns [`StorageError`] on database failure or an undecodable row.
    pub fn get(&self, id: i64) -> Result<Option<Note>, StorageError> {
        self.conn
            .query_row(
                "SELECT id, title, body, language, timestamp, tags, summary
                 FROM notes WHERE id = ?1",
                [id],
                row_to_raw,
            )
            .optional()?
            .map(decode_note)
            .transpose()
    }

    /// List all notes, most recently touched first
    ///
    /// Ordering is derived from the save timestamp (every save re-stamps
    /// it), so an edited old note surfaces at the top of the next fetch.
    ///
    /// # Errors
    /// Returns [`StorageError`] on database failure or an undecodable row.
    pub fn list(&self) -> Result<Vec<Note>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, body, language, timestamp, tags, summary
             FROM notes ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt.query_map([], row_to_raw)?;

        let mut notes = Vec::new();
        for raw in rows {
            notes.push(decode_note(raw?)?);
        }
        Ok(notes)
    }

    /// Delete a note by id; deleting a nonexistent id is a no-op success
    ///
    /// # Errors
    /// Returns [`StorageError`] on database failure.
    pub fn delete(&self, id: i64) -> Result<(), StorageError> {
        let affected = self.conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        debug!(id, affected, "note delete");
        Ok(())
    }
}

/// Raw column values pulled out before fallible decoding
type RawNote = (i64, String, String, String, i64, String, Option<String>);

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawNote> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode_note(raw: RawNote) -> Result<Note, StorageError> {
    let (id, title, body, language, timestamp, tags, summary) = raw;
    let language = Language::parse(&language).ok_or_else(|| StorageError::Corrupt {
        id,
        reason: format!("unknown language tag '{language}'"),
    })?;
    let tags: Vec<String> =
        serde_json::from_str(&tags).map_err(|e| StorageError::Corrupt {
            id,
            reason: format!("bad tags column: {e}"),
        })?;

    Ok(Note {
        id: Some(id),
        title,
        text: body,
        language,
        timestamp,
        tags,
        summary,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> NoteStore {
        NoteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_first_save_assigns_id() {
        let store = store();
        let mut note = Note::new(Language::EnUs);
        note.title = "groceries".to_owned();
        note.text = "buy milk".to_owned();

        let id = store.save(&mut note).unwrap();
        assert_eq!(note.id, Some(id));

        let fetched = store.get(id).unwrap().unwrap();
        assert_eq!(fetched.title, "groceries");
        assert_eq!(fetched.text, "buy milk");
        assert_eq!(fetched.language, Language::EnUs);
    }

    #[test]
    fn test_resave_keeps_id_and_overwrites() {
        let store = store();
        let mut note = Note::new(Language::EnUs);
        note.text = "first".to_owned();
        let id = store.save(&mut note).unwrap();

        note.text = "second".to_owned();
        let id2 = store.save(&mut note).unwrap();
        assert_eq!(id, id2);

        let fetched = store.get(id).unwrap().unwrap();
        assert_eq!(fetched.text, "second");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_blank_title_defaults_at_save() {
        let store = store();
        let mut note = Note::new(Language::EnUs);
        note.title = "   ".to_owned();
        let id = store.save(&mut note).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().title, UNTITLED);
    }

    #[test]
    fn test_save_escapes_title_body_summary() {
        let store = store();
        let mut note = Note::new(Language::EnUs);
        note.title = "<script>".to_owned();
        note.text = "a & b".to_owned();
        note.summary = Some("\"quoted\"".to_owned());
        let id = store.save(&mut note).unwrap();

        let fetched = store.get(id).unwrap().unwrap();
        assert_eq!(fetched.title, "&lt;script&gt;");
        assert_eq!(fetched.text, "a &amp; b");
        assert_eq!(fetched.summary.as_deref(), Some("&quot;quoted&quot;"));
        // The in-memory copy stays raw; escaping happens once per save.
        assert_eq!(note.text, "a & b");
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = store();
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_list_most_recently_saved_first() {
        let store = store();
        let mut a = Note::new(Language::EnUs);
        a.title = "a".to_owned();
        let id_a = store.save(&mut a).unwrap();
        let mut b = Note::new(Language::EnUs);
        b.title = "b".to_owned();
        let id_b = store.save(&mut b).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        // Same-millisecond saves fall back to id order, newest key first.
        assert_eq!(listed[0].id, Some(id_b));
        assert_eq!(listed[1].id, Some(id_a));
    }

    #[test]
    fn test_editing_old_note_surfaces_it_first() {
        let store = store();
        let mut old = Note::new(Language::EnUs);
        let old_id = store.save(&mut old).unwrap();
        let mut newer = Note::new(Language::EnUs);
        let newer_id = store.save(&mut newer).unwrap();

        // Back-date both stamps so the edit below is unambiguously newest.
        store
            .conn
            .execute("UPDATE notes SET timestamp = timestamp - 20000 WHERE id = ?1", [old_id])
            .unwrap();
        store
            .conn
            .execute("UPDATE notes SET timestamp = timestamp - 10000 WHERE id = ?1", [newer_id])
            .unwrap();
        assert_eq!(store.list().unwrap()[0].id, Some(newer_id));

        old.text = "edited later".to_owned();
        store.save(&mut old).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed[0].id, Some(old_id));
    }

    #[test]
    fn test_delete_then_list_excludes_id() {
        let store = store();
        let mut note = Note::new(Language::EnUs);
        let id = store.save(&mut note).unwrap();
        store.delete(id).unwrap();
        assert!(store.get(id).unwrap().is_none());
        assert!(store.list().unwrap().iter().all(|n| n.id != Some(id)));
    }

    #[test]
    fn test_delete_nonexistent_idempotent() {
        let store = store();
        store.delete(999).unwrap();
        store.delete(999).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_tags_round_trip_empty() {
        let store = store();
        let mut note = Note::new(Language::ZhCn);
        let id = store.save(&mut note).unwrap();
        assert!(store.get(id).unwrap().unwrap().tags.is_empty());
    }
}

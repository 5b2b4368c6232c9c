use rusqlite::{Connection, OptionalExtension, Row, params};
use std::cell::RefCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::Note;

/// Storage for notes. Passed explicitly to whatever loads or saves notes.
pub trait NoteRepository {
    fn get(&self, id: Uuid) -> StoreResult<Note>;
    /// Creates and persists an empty note.
    fn create(&self) -> StoreResult<Note>;
    fn update(&self, note: &Note) -> StoreResult<()>;
    fn delete(&self, id: Uuid) -> StoreResult<()>;
    /// All notes, newest first by creation time.
    fn list(&self) -> StoreResult<Vec<Note>>;
}

const SELECT_COLUMNS: &str = "SELECT id, content, created_at, modified_at, word_wrap FROM notes";

pub struct SqliteNoteRepository {
    connection: RefCell<Connection>,
}

impl SqliteNoteRepository {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: RefCell::new(connection),
        }
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> std::cell::Ref<'_, Connection> {
        self.connection.borrow()
    }

    fn insert(&self, note: &Note) -> StoreResult<()> {
        let mut connection = self.connection.borrow_mut();
        let tx = connection.transaction()?;
        tx.execute(
            "INSERT INTO notes (id, content, created_at, modified_at, word_wrap)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                note.id.to_string(),
                note.content,
                note.created_at as i64,
                note.modified_at as i64,
                note.word_wrap,
            ],
        )?;
        tx.commit()?;
        info!(target: "store", id = %note.id, "note_created");
        Ok(())
    }
}

fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    Ok(match row.get::<_, rusqlite::types::Value>(index)? {
        rusqlite::types::Value::Integer(i) => i.max(0) as u64,
        rusqlite::types::Value::Real(f) => f.max(0.0) as u64,
        rusqlite::types::Value::Text(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// Reads a row, keeping a malformed id as text so the caller can report it.
fn read_note(row: &Row<'_>) -> rusqlite::Result<(String, Note)> {
    let id: String = row.get(0)?;
    let note = Note {
        id: Uuid::nil(),
        content: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        created_at: timestamp_column(row, 2)?,
        modified_at: timestamp_column(row, 3)?,
        word_wrap: row.get::<_, Option<bool>>(4)?.unwrap_or(true),
    };
    Ok((id, note))
}

fn with_parsed_id((id, mut note): (String, Note)) -> StoreResult<Note> {
    note.id = Uuid::parse_str(&id).map_err(|_| StoreError::CorruptId(id))?;
    Ok(note)
}

impl NoteRepository for SqliteNoteRepository {
    fn get(&self, id: Uuid) -> StoreResult<Note> {
        let connection = self.connection.borrow();
        let mut stmt = connection.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        let row = stmt
            .query_row([id.to_string()], read_note)
            .optional()?
            .ok_or(StoreError::NotFound(id))?;
        with_parsed_id(row)
    }

    fn create(&self) -> StoreResult<Note> {
        let note = Note::new();
        self.insert(&note)?;
        Ok(note)
    }

    fn update(&self, note: &Note) -> StoreResult<()> {
        let mut connection = self.connection.borrow_mut();
        let tx = connection.transaction()?;
        let rows = tx.execute(
            "UPDATE notes SET content = ?1, modified_at = ?2, word_wrap = ?3 WHERE id = ?4",
            params![
                note.content,
                note.modified_at as i64,
                note.word_wrap,
                note.id.to_string(),
            ],
        )?;
        if rows == 0 {
            // Dropping the transaction rolls it back.
            warn!(target: "store", id = %note.id, "update_missing_note");
            return Err(StoreError::NotFound(note.id));
        }
        tx.commit()?;
        debug!(target: "store", id = %note.id, bytes = note.content.len(), "note_updated");
        Ok(())
    }

    fn delete(&self, id: Uuid) -> StoreResult<()> {
        let connection = self.connection.borrow();
        let rows = connection.execute("DELETE FROM notes WHERE id = ?1", [id.to_string()])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id));
        }
        info!(target: "store", %id, "note_deleted");
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Note>> {
        let connection = self.connection.borrow();
        let mut stmt =
            connection.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC"))?;
        let rows = stmt.query_map([], read_note)?;

        let mut notes = Vec::new();
        for row in rows {
            match with_parsed_id(row?) {
                Ok(note) => notes.push(note),
                Err(e) => warn!(target: "store", error = %e, "skipping_unreadable_note"),
            }
        }
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Database;

    fn repo() -> SqliteNoteRepository {
        Database::in_memory().unwrap().notes
    }

    #[test]
    fn create_then_get() {
        let repo = repo();
        let note = repo.create().unwrap();
        let loaded = repo.get(note.id).unwrap();
        assert_eq!(loaded, note);
        assert!(loaded.word_wrap);
        assert!(loaded.content.is_empty());
    }

    #[test]
    fn update_persists_content_and_wrap_flag() {
        let repo = repo();
        let mut note = repo.create().unwrap();
        note.set_content("Hello\nWorld".into());
        note.word_wrap = false;
        repo.update(&note).unwrap();

        let loaded = repo.get(note.id).unwrap();
        assert_eq!(loaded.content, "Hello\nWorld");
        assert!(!loaded.word_wrap);
    }

    #[test]
    fn update_of_unknown_note_is_not_found() {
        let repo = repo();
        let ghost = Note::new();
        assert!(matches!(repo.update(&ghost), Err(StoreError::NotFound(id)) if id == ghost.id));
    }

    #[test]
    fn delete_removes_note() {
        let repo = repo();
        let note = repo.create().unwrap();
        repo.delete(note.id).unwrap();
        assert!(matches!(repo.get(note.id), Err(StoreError::NotFound(_))));
        assert!(matches!(repo.delete(note.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_is_newest_first() {
        let repo = repo();
        let mut older = Note::new();
        older.created_at = 100;
        let mut newer = Note::new();
        newer.created_at = 200;
        repo.insert(&older).unwrap();
        repo.insert(&newer).unwrap();
        let same_second = repo.create().unwrap();

        let ids: Vec<Uuid> = repo.list().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![same_second.id, newer.id, older.id]);
    }

    #[test]
    fn list_skips_rows_with_corrupt_ids() {
        let repo = repo();
        let good = repo.create().unwrap();
        repo.connection
            .borrow()
            .execute(
                "INSERT INTO notes (id, content, created_at, modified_at) VALUES ('nope', '', 1, 1)",
                [],
            )
            .unwrap();
        let notes = repo.list().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, good.id);
    }
}

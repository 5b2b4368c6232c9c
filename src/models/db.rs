use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::models::SqliteNoteRepository;

const SCHEMA_VERSION: i64 = 2;

const CREATE_NOTES: &str = "CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    modified_at INTEGER NOT NULL,
    word_wrap INTEGER NOT NULL DEFAULT 1
)";

pub struct Database {
    pub notes: SqliteNoteRepository,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        info!(target: "store", path = %path.display(), "opening_database");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                debug!(target: "store", dir = %parent.display(), "created_data_dir");
            }
        }

        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        for pragma in [
            "PRAGMA synchronous = FULL",
            "PRAGMA journal_mode = DELETE",
            "PRAGMA foreign_keys = ON",
        ] {
            // journal_mode returns a row, which `execute` rejects.
            if let Err(e) = connection.execute_batch(pragma) {
                warn!(target: "store", pragma, error = %e, "pragma_failed");
            }
        }

        connection.execute(CREATE_NOTES, [])?;
        migrate_database(&connection)?;
        connection.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            notes: SqliteNoteRepository::new(connection),
        })
    }
}

fn column_types(connection: &Connection) -> StoreResult<Vec<(String, String)>> {
    let mut stmt = connection.prepare("PRAGMA table_info(notes)")?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Adds columns that stores written by earlier builds lack.
fn migrate_database(connection: &Connection) -> StoreResult<()> {
    let columns = column_types(connection)?;
    let has = |name: &str| columns.iter().any(|(column, _)| column == name);

    if !has("modified_at") {
        info!(target: "store", column = "modified_at", "adding_column");
        connection.execute(
            "ALTER TABLE notes ADD COLUMN modified_at INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
        connection.execute("UPDATE notes SET modified_at = created_at", [])?;
    }

    if !has("word_wrap") {
        info!(target: "store", column = "word_wrap", "adding_column");
        connection.execute(
            "ALTER TABLE notes ADD COLUMN word_wrap INTEGER NOT NULL DEFAULT 1",
            [],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteRepository;

    #[test]
    fn adds_missing_columns_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        {
            let connection = Connection::open(&path).unwrap();
            connection
                .execute_batch(
                    "CREATE TABLE notes (
                        id TEXT PRIMARY KEY,
                        content TEXT NOT NULL,
                        created_at INTEGER NOT NULL
                    );
                    INSERT INTO notes VALUES ('0b5a4e4e-2a3f-4e0b-8c43-3a3c5f8d2e11', 'x', 42);",
                )
                .unwrap();
        }

        let db = Database::new(&path).unwrap();
        let notes = db.notes.list().unwrap();
        assert_eq!(notes[0].modified_at, 42);
        assert!(notes[0].word_wrap);
    }

    #[test]
    fn reopening_current_schema_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.db");
        let id = {
            let db = Database::new(&path).unwrap();
            db.notes.create().unwrap().id
        };
        let db = Database::new(&path).unwrap();
        assert_eq!(db.notes.get(id).unwrap().id, id);
    }
}

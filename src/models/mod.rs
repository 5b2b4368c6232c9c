mod db;
mod note;
mod note_repository;

pub use db::Database;
pub use note::Note;
pub use note_repository::{NoteRepository, SqliteNoteRepository};

pub mod line_number_gutter;
pub mod note_app;
pub mod note_editor;
pub mod note_list;
pub mod status_bar;

pub use note_app::{DeleteNote, NewNote, NoteApp, Quit, ToggleSidebar, ToggleWordWrap};

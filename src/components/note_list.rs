use uuid::Uuid;

use crate::models::Note;

/// Sidebar contents: cached notes in display order plus the selection.
#[derive(Debug, Default, Clone)]
pub struct NoteList {
    notes: Vec<Note>,
    active: Option<Uuid>,
}

impl NoteList {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            notes,
            active: None,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn active_note(&self) -> Option<&Note> {
        let id = self.active?;
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn active_note_mut(&mut self) -> Option<&mut Note> {
        let id = self.active?;
        self.notes.iter_mut().find(|note| note.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.notes.iter().any(|note| note.id == id)
    }

    /// Selects `id` if it is in the list.
    pub fn select(&mut self, id: Uuid) -> bool {
        if self.contains(id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn select_first(&mut self) -> Option<Uuid> {
        self.active = self.notes.first().map(|note| note.id);
        self.active
    }

    /// New notes go to the top, matching the newest-first ordering.
    pub fn insert_front(&mut self, note: Note) {
        self.active = Some(note.id);
        self.notes.insert(0, note);
    }

    /// Replaces the cached copy of a note. Returns false if it is not listed.
    pub fn replace(&mut self, note: Note) -> bool {
        match self.notes.iter_mut().find(|cached| cached.id == note.id) {
            Some(cached) => {
                *cached = note;
                true
            }
            None => false,
        }
    }

    /// Selection that should follow deleting `id`: the next note in the list,
    /// else the previous one, else nothing. Unchanged if `id` is not active.
    pub fn selection_after_removing(&self, id: Uuid) -> Option<Uuid> {
        if self.active != Some(id) {
            return self.active;
        }
        let position = self.notes.iter().position(|note| note.id == id)?;
        self.notes
            .get(position + 1)
            .or_else(|| position.checked_sub(1).and_then(|prev| self.notes.get(prev)))
            .map(|note| note.id)
    }

    /// Removes `id` and reassigns the selection. Returns the new selection.
    pub fn remove(&mut self, id: Uuid) -> Option<Uuid> {
        let next = self.selection_after_removing(id);
        self.notes.retain(|note| note.id != id);
        self.active = next;
        next
    }
}

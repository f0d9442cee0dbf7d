//! In-memory note store used by tests and hosts without persistence.

use crate::model::note::{Note, NoteId};
use crate::repo::{NoteStore, RepoError, RepoResult};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryNoteStore {
    notes: Vec<Note>,
    positions: HashMap<NoteId, usize>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `notes`; later duplicates replace earlier ones.
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> RepoResult<Self> {
        let mut store = Self::new();
        for note in notes {
            store.upsert_note(&note)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteStore for InMemoryNoteStore {
    fn get_all_notes(&self) -> RepoResult<Vec<Note>> {
        Ok(self.notes.clone())
    }

    fn get_notes_page(&self, limit: usize, offset: usize) -> RepoResult<Vec<Note>> {
        Ok(self.notes.iter().skip(offset).take(limit).cloned().collect())
    }

    fn count_notes(&self) -> RepoResult<usize> {
        Ok(self.notes.len())
    }

    fn get_note(&self, id: &str) -> RepoResult<Option<Note>> {
        Ok(self.positions.get(id).map(|&pos| self.notes[pos].clone()))
    }

    fn upsert_note(&mut self, note: &Note) -> RepoResult<()> {
        note.validate()?;
        match self.positions.get(&note.id) {
            Some(&pos) => self.notes[pos] = note.clone(),
            None => {
                self.positions.insert(note.id.clone(), self.notes.len());
                self.notes.push(note.clone());
            }
        }
        Ok(())
    }

    fn delete_note(&mut self, id: &str) -> RepoResult<()> {
        let Some(pos) = self.positions.remove(id) else {
            return Err(RepoError::NotFound(id.to_string()));
        };
        self.notes.remove(pos);
        for position in self.positions.values_mut() {
            if *position > pos {
                *position -= 1;
            }
        }
        Ok(())
    }
}

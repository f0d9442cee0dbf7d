//! Note store contracts and implementations.
//!
//! # Responsibility
//! - Define the `NoteStore` collaborator consumed by the workspace service.
//! - Provide in-memory and SQLite-backed stores.
//!
//! # Invariants
//! - Writes validate notes before persistence.
//! - `get_all_notes` returns notes in first-insertion order; updates keep a
//!   note's position.

use crate::db::DbError;
use crate::model::note::{Note, NoteId, NoteValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory_repo;
pub mod note_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Store error for note persistence and lookups.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "note store is missing required table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Note store consumed by search and analytics.
pub trait NoteStore {
    /// Returns every note in insertion order.
    fn get_all_notes(&self) -> RepoResult<Vec<Note>>;

    /// Returns at most `limit` notes in insertion order, skipping the first
    /// `offset`. An offset past the end yields an empty page.
    fn get_notes_page(&self, limit: usize, offset: usize) -> RepoResult<Vec<Note>> {
        Ok(self
            .get_all_notes()?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn count_notes(&self) -> RepoResult<usize> {
        Ok(self.get_all_notes()?.len())
    }

    fn get_note(&self, id: &str) -> RepoResult<Option<Note>>;
    /// Inserts or fully replaces one note.
    fn upsert_note(&mut self, note: &Note) -> RepoResult<()>;
    /// Removes one note; `NotFound` when absent.
    fn delete_note(&mut self, id: &str) -> RepoResult<()>;
}

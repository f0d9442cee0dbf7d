//! SQLite-backed note store.
//!
//! # Responsibility
//! - Persist notes with their tag and link sets.
//! - Replace tags/links atomically on every upsert.
//!
//! # Invariants
//! - Notes are listed by first insertion (`rowid`); upserts keep rowid.
//! - Tag and link order is preserved through the `position` column.
//! - Link targets may reference notes that do not exist.

use crate::model::note::Note;
use crate::repo::{NoteStore, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    body,
    color,
    created_at,
    updated_at
FROM notes";

/// Note store over a migrated connection (see `db::open_db`).
pub struct SqliteNoteStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Wraps a migrated connection, rejecting connections missing the schema.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in ["notes", "note_tags", "note_links"] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }

    /// Ids of notes linking to `id`, ordered by referrer insertion.
    pub fn referrer_ids(&self, id: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.note_id
             FROM note_links l
             INNER JOIN notes n ON n.id = l.note_id
             WHERE l.target_id = ?1
             ORDER BY n.rowid ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn get_all_notes(&self) -> RepoResult<Vec<Note>> {
        let mut tags = load_children(self.conn, "note_tags", "tag")?;
        let mut links = load_children(self.conn, "note_links", "target_id")?;

        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let mut note = parse_note_row(row)?;
            note.tags = tags.remove(&note.id).unwrap_or_default();
            note.links = links.remove(&note.id).unwrap_or_default();
            notes.push(note);
        }
        Ok(notes)
    }

    fn get_notes_page(&self, limit: usize, offset: usize) -> RepoResult<Vec<Note>> {
        // SQLite binds LIMIT/OFFSET as i64; larger values mean "everything".
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} ORDER BY rowid ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![limit, offset])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let mut note = parse_note_row(row)?;
            note.tags = load_children_for(self.conn, "note_tags", "tag", &note.id)?;
            note.links = load_children_for(self.conn, "note_links", "target_id", &note.id)?;
            notes.push(note);
        }
        Ok(notes)
    }

    fn count_notes(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative note count {count}")))
    }

    fn get_note(&self, id: &str) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let note = stmt.query_row([id], |row| Ok(parse_note_row(row))).optional()?;
        let Some(note) = note else {
            return Ok(None);
        };
        let mut note = note?;
        note.tags = load_children_for(self.conn, "note_tags", "tag", id)?;
        note.links = load_children_for(self.conn, "note_links", "target_id", id)?;
        Ok(Some(note))
    }

    fn upsert_note(&mut self, note: &Note) -> RepoResult<()> {
        note.validate()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO notes (id, title, body, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                color = excluded.color,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at;",
            params![
                note.id.as_str(),
                note.title.as_str(),
                note.body.as_str(),
                note.color.as_str(),
                note.created_at.as_str(),
                note.updated_at.as_str(),
            ],
        )?;

        tx.execute("DELETE FROM note_tags WHERE note_id = ?1;", [note.id.as_str()])?;
        for (position, tag) in note.tags.iter().enumerate() {
            tx.execute(
                "INSERT INTO note_tags (note_id, tag, position) VALUES (?1, ?2, ?3);",
                params![note.id.as_str(), tag.as_str(), position as i64],
            )?;
        }

        tx.execute("DELETE FROM note_links WHERE note_id = ?1;", [note.id.as_str()])?;
        for (position, target) in note.links.iter().enumerate() {
            tx.execute(
                "INSERT INTO note_links (note_id, target_id, position) VALUES (?1, ?2, ?3);",
                params![note.id.as_str(), target.as_str(), position as i64],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_note(&mut self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn parse_note_row(row: &rusqlite::Row<'_>) -> RepoResult<Note> {
    let note = Note {
        id: row.get("id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        tags: Vec::new(),
        links: Vec::new(),
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    if note.id.trim().is_empty() {
        return Err(RepoError::InvalidData("empty id in notes.id".to_string()));
    }
    Ok(note)
}

/// Loads one child column grouped by note id. `table`/`column` are
/// compile-time constants, never user input.
fn load_children(
    conn: &Connection,
    table: &'static str,
    column: &'static str,
) -> RepoResult<HashMap<String, Vec<String>>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT note_id, {column} FROM {table} ORDER BY note_id, position ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let note_id: String = row.get(0)?;
        grouped.entry(note_id).or_default().push(row.get(1)?);
    }
    Ok(grouped)
}

fn load_children_for(
    conn: &Connection,
    table: &'static str,
    column: &'static str,
    note_id: &str,
) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column} FROM {table} WHERE note_id = ?1 ORDER BY position ASC;"
    ))?;
    let mut rows = stmt.query([note_id])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(row.get(0)?);
    }
    Ok(values)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

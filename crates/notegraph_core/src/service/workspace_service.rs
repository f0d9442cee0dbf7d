//! Workspace use-case service.
//!
//! # Responsibility
//! - Save notes through the store, resolving `[[wiki-links]]` to note ids.
//! - Keep one owned `SearchIndex` in sync with the store on demand.
//! - Expose search, graph metrics and insights over the stored collection.
//!
//! # Invariants
//! - Explicit `links` are kept as given (minus self-links); wiki-links only
//!   add ids of notes that existed at save time.
//! - The index is rebuilt lazily after any write, never mid-query.

use crate::config::NotegraphConfig;
use crate::graph::analytics::{GraphAnalytics, Metrics};
use crate::graph::insights::{generate_insights, Insight};
use crate::model::note::{Note, NoteId};
use crate::repo::{NoteStore, RepoError, RepoResult};
use crate::search::index::{IndexStats, SearchHit, SearchIndex};
use crate::search::query::FilterPatch;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static WIKI_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]|]+)(?:\|[^\[\]]*)?\]\]").expect("valid wiki-link regex"));

/// Service error for workspace use-cases.
#[derive(Debug)]
pub enum WorkspaceError {
    NoteNotFound(NoteId),
    Repo(RepoError),
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::NoteNotFound(_) => None,
        }
    }
}

impl From<RepoError> for WorkspaceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Point-in-time health of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceHealth {
    /// The store answered a count query.
    pub healthy: bool,
    pub note_count: usize,
    /// No writes happened since the last index rebuild.
    pub index_fresh: bool,
    pub cache_hit_ratio: f64,
    pub cache_evictions: usize,
}

/// Facade over a note store, its search index and the analytics engine.
pub struct NoteWorkspace<S: NoteStore> {
    store: S,
    index: SearchIndex,
    analytics: GraphAnalytics,
    index_stale: bool,
}

impl<S: NoteStore> NoteWorkspace<S> {
    pub fn new(store: S, config: &NotegraphConfig) -> Self {
        Self {
            store,
            index: SearchIndex::new(config.index.clone()),
            analytics: GraphAnalytics::new(config.analytics.clone()),
            index_stale: true,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a note with a generated id.
    pub fn create_note(
        &mut self,
        title: impl Into<String>,
        body: impl Into<String>,
        tags: &[&str],
    ) -> WorkspaceResult<Note> {
        let note = Note::new(Uuid::new_v4().to_string(), title, body).with_tags(tags);
        self.save_note(note)
    }

    /// Saves `note`, stamping timestamps with the current UTC time.
    pub fn save_note(&mut self, note: Note) -> WorkspaceResult<Note> {
        self.save_note_at(note, Utc::now())
    }

    /// Saves `note` with `now` as the update time.
    ///
    /// Wiki-links in the body are resolved by title (case-insensitive) or
    /// id and appended to `links`; unresolved wiki-links are dropped.
    pub fn save_note_at(&mut self, mut note: Note, now: DateTime<Utc>) -> WorkspaceResult<Note> {
        let existing = self.store.get_all_notes()?;
        let known = known_targets(&existing);

        let mut links: Vec<NoteId> = Vec::new();
        let push_link = |links: &mut Vec<NoteId>, target: &str| {
            if target != note.id && !links.iter().any(|link| link == target) {
                links.push(target.to_string());
            }
        };
        for target in &note.links {
            push_link(&mut links, target);
        }
        let mut unresolved = 0usize;
        for target in extract_wiki_links(&note.body) {
            match resolve_target(&known, &target) {
                Some(id) => push_link(&mut links, id),
                None => unresolved += 1,
            }
        }
        note.links = links;

        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        if note.created_at.is_empty() {
            note.created_at = existing
                .iter()
                .find(|stored| stored.id == note.id)
                .map(|stored| stored.created_at.clone())
                .filter(|created| !created.is_empty())
                .unwrap_or_else(|| stamp.clone());
        }
        note.updated_at = stamp;

        self.store.upsert_note(&note)?;
        self.index_stale = true;
        info!(
            "event=note_save module=service status=ok links={} unresolved_links={}",
            note.links.len(),
            unresolved
        );
        Ok(note)
    }

    pub fn get_note(&self, id: &str) -> RepoResult<Option<Note>> {
        self.store.get_note(id)
    }

    /// One page of stored notes in insertion order.
    pub fn list_notes(&self, limit: usize, offset: usize) -> WorkspaceResult<Vec<Note>> {
        Ok(self.store.get_notes_page(limit, offset)?)
    }

    pub fn delete_note(&mut self, id: &str) -> WorkspaceResult<()> {
        self.store.delete_note(id)?;
        self.index_stale = true;
        Ok(())
    }

    /// Rebuilds the search index from the store when writes happened.
    pub fn refresh_index(&mut self) -> WorkspaceResult<()> {
        if !self.index_stale {
            return Ok(());
        }
        let notes = self.store.get_all_notes()?;
        self.index.build_index(&notes);
        self.index_stale = false;
        debug!(
            "event=index_refresh module=service status=ok notes={}",
            notes.len()
        );
        Ok(())
    }

    pub fn search(&mut self, query: &str, limit: usize) -> WorkspaceResult<Vec<SearchHit>> {
        self.refresh_index()?;
        Ok(self.index.search(query, limit))
    }

    pub fn search_at(
        &mut self,
        query: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> WorkspaceResult<Vec<SearchHit>> {
        self.refresh_index()?;
        Ok(self.index.search_at(query, limit, now))
    }

    pub fn search_by_tag(&mut self, prefix: &str, limit: usize) -> WorkspaceResult<Vec<String>> {
        self.refresh_index()?;
        Ok(self.index.search_by_tag(prefix, limit))
    }

    pub fn related_notes(&mut self, id: &str, limit: usize) -> WorkspaceResult<Vec<Note>> {
        self.refresh_index()?;
        if self.index.note(id).is_none() {
            return Err(WorkspaceError::NoteNotFound(id.to_string()));
        }
        Ok(self.index.related_notes(id, limit))
    }

    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.index.set_filters(patch);
    }

    pub fn clear_filters(&mut self) {
        self.index.clear_filters();
    }

    pub fn stats(&mut self) -> WorkspaceResult<IndexStats> {
        self.refresh_index()?;
        Ok(self.index.stats())
    }

    /// Reports store reachability and index bookkeeping. Store failures are
    /// logged and reported as unhealthy rather than returned.
    pub fn health_check(&self) -> WorkspaceHealth {
        let stats = self.index.stats();
        let (healthy, note_count) = match self.store.count_notes() {
            Ok(count) => (true, count),
            Err(err) => {
                error!("event=health_check module=service status=error reason={err}");
                (false, 0)
            }
        };
        WorkspaceHealth {
            healthy,
            note_count,
            index_fresh: !self.index_stale,
            cache_hit_ratio: stats.cache_hit_ratio,
            cache_evictions: stats.cache_evictions,
        }
    }

    pub fn metrics(&self) -> WorkspaceResult<Metrics> {
        let notes = self.store.get_all_notes()?;
        Ok(self.analytics.calculate_metrics(&notes))
    }

    pub fn insights(&self) -> WorkspaceResult<Vec<Insight>> {
        let notes = self.store.get_all_notes()?;
        let metrics = self.analytics.calculate_metrics(&notes);
        Ok(generate_insights(&metrics, &notes))
    }
}

/// Extracts `[[Target]]` / `[[Target|alias]]` targets in order of
/// appearance.
pub fn extract_wiki_links(body: &str) -> Vec<String> {
    WIKI_LINK_RE
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|target| !target.is_empty())
        .collect()
}

/// Maps lowercase titles and raw ids to note ids; ids win over titles.
fn known_targets(notes: &[Note]) -> HashMap<String, NoteId> {
    let mut targets = HashMap::new();
    for note in notes {
        if !note.title.trim().is_empty() {
            targets.insert(note.title.trim().to_lowercase(), note.id.clone());
        }
    }
    for note in notes {
        targets.insert(note.id.clone(), note.id.clone());
    }
    targets
}

fn resolve_target<'a>(known: &'a HashMap<String, NoteId>, target: &str) -> Option<&'a str> {
    known
        .get(target)
        .or_else(|| known.get(&target.trim().to_lowercase()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::extract_wiki_links;

    #[test]
    fn extracts_targets_and_strips_aliases() {
        let body = "see [[Graph Theory]] and [[trees|the trees note]] but not [single]";
        assert_eq!(extract_wiki_links(body), vec!["Graph Theory", "trees"]);
    }

    #[test]
    fn ignores_empty_links() {
        assert!(extract_wiki_links("[[ ]] [[]]").is_empty());
    }
}

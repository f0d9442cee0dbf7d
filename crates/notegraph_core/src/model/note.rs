//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record read by the search index and the
//!   graph analytics engine.
//! - Normalize loosely-typed input (`RawNote`) exactly once.
//!
//! # Invariants
//! - `id` is never empty for a validated note.
//! - `tags` are trimmed, lowercase, `#`-prefixed and unique.
//! - `links` are unique and keep first-occurrence order.
//! - Missing text fields and timestamps are stored as `""`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque note identifier owned by the note store.
pub type NoteId = String;

/// Validation error for note invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// `id` is empty or whitespace only.
    EmptyId,
    /// A note links to itself by id.
    SelfLink(NoteId),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "note id cannot be empty"),
            Self::SelfLink(id) => write!(f, "note `{id}` links to itself"),
        }
    }
}

impl Error for NoteValidationError {}

/// Loosely-shaped note input as delivered by external collaborators.
///
/// Every field except `id` may be absent. Use [`Note::from_raw`] to obtain a
/// fully-populated [`Note`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNote {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub links: Option<Vec<String>>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<String>,
}

/// Canonical note record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    /// Normalized tags (`#name`).
    pub tags: Vec<String>,
    /// Resolved wiki-link targets, deduplicated.
    pub links: Vec<NoteId>,
    /// Categorical label, conventionally a hex color.
    pub color: String,
    /// ISO-8601 creation timestamp, `""` when unknown.
    pub created_at: String,
    /// ISO-8601 update timestamp, `""` when unknown.
    pub updated_at: String,
}

impl Note {
    /// Creates a note with empty tags/links/color/timestamps.
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
            links: Vec::new(),
            color: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Normalizes a raw note into the canonical shape.
    pub fn from_raw(raw: RawNote) -> Self {
        Self {
            id: raw.id.trim().to_string(),
            title: raw.title.unwrap_or_default(),
            body: raw.body.unwrap_or_default(),
            tags: normalize_tags(&raw.tags.unwrap_or_default()),
            links: normalize_links(&raw.links.unwrap_or_default()),
            color: raw.color.unwrap_or_default(),
            created_at: raw.created_at.unwrap_or_default(),
            updated_at: raw.updated_at.unwrap_or_default(),
        }
    }

    /// Replaces tags, normalizing them.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_string())
            .collect::<Vec<_>>();
        self.tags = normalize_tags(&tags);
        self
    }

    /// Replaces links, deduplicating them.
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let links = links
            .into_iter()
            .map(|link| link.as_ref().to_string())
            .collect::<Vec<_>>();
        self.links = normalize_links(&links);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_timestamps(
        mut self,
        created_at: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Self {
        self.created_at = created_at.into();
        self.updated_at = updated_at.into();
        self
    }

    /// Validates identity invariants.
    ///
    /// Self-links are tolerated by analytics but rejected on the write path.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.id.trim().is_empty() {
            return Err(NoteValidationError::EmptyId);
        }
        if self.links.iter().any(|link| link == &self.id) {
            return Err(NoteValidationError::SelfLink(self.id.clone()));
        }
        Ok(())
    }

    /// Returns the `YYYY-MM-DD` prefix of `updated_at`, falling back to
    /// `created_at`.
    pub fn date_key(&self) -> &str {
        let source = if self.updated_at.is_empty() {
            self.created_at.as_str()
        } else {
            self.updated_at.as_str()
        };
        source.get(..10).unwrap_or(source)
    }

    /// Returns whether this note carries the normalized `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value == tag)
    }
}

impl From<RawNote> for Note {
    fn from(value: RawNote) -> Self {
        Self::from_raw(value)
    }
}

/// Normalizes one tag value: trimmed, lowercase, `#`-prefixed.
///
/// Returns `None` for blank input or a bare `#`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("#{}", trimmed.to_lowercase()))
    }
}

/// Normalizes and deduplicates tag values, keeping first-occurrence order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

fn normalize_links(links: &[String]) -> Vec<NoteId> {
    let mut seen = HashSet::new();
    links
        .iter()
        .map(|link| link.trim())
        .filter(|link| !link.is_empty())
        .filter(|link| seen.insert(link.to_string()))
        .map(str::to_string)
        .collect()
}

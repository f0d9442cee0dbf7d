//! In-memory note search index.
//!
//! # Responsibility
//! - Hold tokenized per-note fields plus tag/title/link/color lookups.
//! - Score and rank notes for free-text queries with structured filters.
//! - Offer tag completion, related-note suggestions and index statistics.
//!
//! # Invariants
//! - `build_index` replaces every derived structure wholesale and is
//!   idempotent for an unchanged collection.
//! - Result ordering is score descending, ties in index (input) order.
//! - `search` never fails; empty or filter-less blank queries yield nothing.
//! - Index state is only mutated through `&mut self`; callers sharing one
//!   index across threads must wrap it so rebuilds are exclusive.

use crate::config::IndexConfig;
use crate::graph::builder::build_graph;
use crate::model::note::{normalize_tag, Note, NoteId};
use crate::search::cache::{CachedTokens, TokenCache};
use crate::search::query::{parse_query_at, FilterPatch, FilterTarget, SearchFilters};
use crate::search::tokenize::tokenize;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::time::Instant;

const TITLE_SUBSTRING_SCORE: f64 = 10.0;
const EXACT_TITLE_SCORE: f64 = 20.0;
const TITLE_TOKEN_SCORE: f64 = 5.0;
const BODY_TOKEN_SCORE: f64 = 1.0;
const TAG_SCORE: f64 = 3.0;
const FILTER_ONLY_BASE_SCORE: f64 = 1.0;

/// Field a query term matched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Title,
    Body,
    Tag,
}

/// One term/field match contributing to a hit's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub field: MatchField,
    pub term: String,
}

/// Ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub note: Note,
    pub score: f64,
    pub matches: Vec<SearchMatch>,
}

/// Snapshot of index size and last-build bookkeeping.
///
/// `cache_hits`, `cache_misses` and `cache_hit_ratio` describe the last
/// non-skipped build; `cache_evictions` is cumulative.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub note_count: usize,
    pub distinct_tokens: usize,
    pub tag_count: usize,
    pub link_count: usize,
    pub cache_entries: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// `hits / (hits + misses)`; 0.0 when nothing was looked up.
    pub cache_hit_ratio: f64,
    pub cache_evictions: usize,
    pub last_build_ms: u64,
    pub last_build_skipped: bool,
    pub filters_active: bool,
}

/// Derived per-note record; superseded wholesale on every rebuild.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub note: Note,
    pub title_lower: String,
    pub title_tokens: Vec<String>,
    pub body_tokens: Vec<String>,
    pub backlink_count: usize,
    title_joined: String,
    body_joined: String,
}

impl FilterTarget for &IndexEntry {
    fn note(&self) -> &Note {
        &self.note
    }

    fn backlink_count(&self) -> usize {
        self.backlink_count
    }
}

/// Owned search index; construct one per note collection.
#[derive(Debug)]
pub struct SearchIndex {
    config: IndexConfig,
    entries: Vec<IndexEntry>,
    positions: HashMap<NoteId, usize>,
    tag_index: HashMap<String, Vec<NoteId>>,
    title_index: HashMap<String, NoteId>,
    link_index: HashMap<NoteId, Vec<NoteId>>,
    color_index: HashMap<String, Vec<NoteId>>,
    cache: TokenCache,
    filters: SearchFilters,
    fingerprint: Option<u64>,
    stats: IndexStats,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl SearchIndex {
    pub fn new(config: IndexConfig) -> Self {
        let cache = TokenCache::new(config.cache_capacity);
        Self {
            config,
            entries: Vec::new(),
            positions: HashMap::new(),
            tag_index: HashMap::new(),
            title_index: HashMap::new(),
            link_index: HashMap::new(),
            color_index: HashMap::new(),
            cache,
            filters: SearchFilters::default(),
            fingerprint: None,
            stats: IndexStats::default(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Rebuilds the index from `notes`.
    ///
    /// Returns early when the collection fingerprint matches the last build.
    /// Duplicate ids keep their first occurrence.
    pub fn build_index(&mut self, notes: &[Note]) {
        let started_at = Instant::now();
        let fingerprint = collection_fingerprint(notes);
        if self.fingerprint == Some(fingerprint) {
            self.stats.last_build_skipped = true;
            self.stats.last_build_ms = elapsed_ms(started_at);
            debug!(
                "event=index_build module=search status=skipped notes={}",
                notes.len()
            );
            return;
        }

        let graph = build_graph(notes);
        let mut entries = Vec::with_capacity(notes.len());
        let mut positions = HashMap::with_capacity(notes.len());
        let mut cache_hits = 0;
        let mut cache_misses = 0;

        for note in notes {
            if positions.contains_key(&note.id) {
                warn!(
                    "event=index_build module=search status=warn reason=duplicate_id note_id={}",
                    note.id
                );
                continue;
            }

            let tokens = match self.cache.get(&note.id, &note.updated_at) {
                Some(cached) => {
                    cache_hits += 1;
                    cached.clone()
                }
                None => {
                    cache_misses += 1;
                    let fresh = CachedTokens {
                        title_tokens: tokenize(&note.title),
                        body_tokens: tokenize(&note.body),
                    };
                    // An empty timestamp cannot tell versions apart.
                    if !note.updated_at.is_empty() {
                        self.cache.insert(&note.id, &note.updated_at, fresh.clone());
                    }
                    fresh
                }
            };

            positions.insert(note.id.clone(), entries.len());
            entries.push(IndexEntry {
                note: note.clone(),
                title_lower: note.title.to_lowercase(),
                title_joined: tokens.title_tokens.join(" "),
                body_joined: tokens.body_tokens.join(" "),
                title_tokens: tokens.title_tokens,
                body_tokens: tokens.body_tokens,
                backlink_count: graph.backlinks(&note.id),
            });
        }

        self.entries = entries;
        self.positions = positions;
        self.rebuild_secondary_indexes();
        self.fingerprint = Some(fingerprint);
        self.stats = IndexStats {
            cache_hits,
            cache_misses,
            cache_hit_ratio: hit_ratio(cache_hits, cache_misses),
            last_build_ms: elapsed_ms(started_at),
            last_build_skipped: false,
            ..self.compute_stats()
        };

        info!(
            "event=index_build module=search status=ok notes={} cache_hits={} cache_misses={} cache_evictions={} duration_ms={}",
            self.entries.len(),
            cache_hits,
            cache_misses,
            self.stats.cache_evictions,
            self.stats.last_build_ms
        );
    }

    fn rebuild_secondary_indexes(&mut self) {
        let mut tag_index: HashMap<String, Vec<NoteId>> = HashMap::new();
        let mut title_index = HashMap::new();
        let mut link_index: HashMap<NoteId, Vec<NoteId>> = HashMap::new();
        let mut color_index: HashMap<String, Vec<NoteId>> = HashMap::new();

        for entry in &self.entries {
            let id = &entry.note.id;
            for tag in &entry.note.tags {
                tag_index.entry(tag.clone()).or_default().push(id.clone());
            }
            if !entry.title_lower.is_empty() {
                title_index.insert(entry.title_lower.clone(), id.clone());
            }
            for target in &entry.note.links {
                link_index.entry(target.clone()).or_default().push(id.clone());
            }
            if !entry.note.color.is_empty() {
                color_index
                    .entry(entry.note.color.to_lowercase())
                    .or_default()
                    .push(id.clone());
            }
        }

        self.tag_index = tag_index;
        self.title_index = title_index;
        self.link_index = link_index;
        self.color_index = color_index;
    }

    /// Searches with the current UTC time as the recency reference.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.search_at(query, limit, Utc::now())
    }

    /// Searches with `now` as the reference for date keywords and recency.
    ///
    /// `limit == 0` falls back to `IndexConfig::default_limit`.
    pub fn search_at(&self, query: &str, limit: usize, now: DateTime<Utc>) -> Vec<SearchHit> {
        let parsed = parse_query_at(query, now);
        let filters = self.filters.merge(&parsed.filters);
        if parsed.terms.is_empty() && filters.is_empty() {
            return Vec::new();
        }

        let candidates = filters.apply(self.entries.iter().collect::<Vec<_>>());
        let exact_title = parsed.text_query.trim().to_lowercase();
        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|entry| {
                let (base, matches) = if parsed.terms.is_empty() {
                    (FILTER_ONLY_BASE_SCORE, Vec::new())
                } else {
                    score_terms(entry, &parsed.terms, &exact_title)
                };
                let score = base * self.boost(entry, now);
                (score > 0.0).then(|| SearchHit {
                    note: entry.note.clone(),
                    score,
                    matches,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(self.effective_limit(limit));
        debug!(
            "event=search module=search status=ok terms={} hits={}",
            parsed.terms.len(),
            hits.len()
        );
        hits
    }

    fn boost(&self, entry: &IndexEntry, now: DateTime<Utc>) -> f64 {
        let mut multiplier = 1.0;
        if let Some(updated) = parse_timestamp(&entry.note.updated_at) {
            if now.signed_duration_since(updated) <= Duration::days(self.config.recency_window_days)
            {
                multiplier *= self.config.recency_boost;
            }
        }
        let links = entry.note.links.len();
        if links > 0 {
            multiplier *= 1.0 + self.config.link_boost * links as f64;
        }
        if entry.backlink_count > 0 {
            multiplier *= 1.0 + self.config.backlink_boost * entry.backlink_count as f64;
        }
        multiplier
    }

    fn effective_limit(&self, limit: usize) -> usize {
        if limit == 0 {
            self.config.default_limit
        } else {
            limit
        }
    }

    /// Returns tags starting with `prefix`, most used first.
    pub fn search_by_tag(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = normalize_tag(prefix).unwrap_or_else(|| "#".to_string());
        let mut tags: Vec<(&String, usize)> = self
            .tag_index
            .iter()
            .filter(|(tag, _)| tag.starts_with(&prefix))
            .map(|(tag, ids)| (tag, ids.len()))
            .collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tags.into_iter()
            .take(self.effective_limit(limit))
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    /// Ranks notes related to `note_id` by shared tags and link proximity.
    ///
    /// Returns an empty list for unknown ids.
    pub fn related_notes(&self, note_id: &str, limit: usize) -> Vec<Note> {
        let Some(source) = self.entry(note_id) else {
            return Vec::new();
        };
        let source_tags: HashSet<&String> = source.note.tags.iter().collect();
        let source_links: HashSet<&NoteId> = source.note.links.iter().collect();

        let mut scored: Vec<(&IndexEntry, f64)> = self
            .entries
            .iter()
            .filter(|entry| entry.note.id != source.note.id)
            .map(|entry| {
                let note = &entry.note;
                let shared_tags = note.tags.iter().filter(|t| source_tags.contains(t)).count();
                let shared_targets = note
                    .links
                    .iter()
                    .filter(|l| source_links.contains(l))
                    .count();
                let mut score = 2.0 * shared_tags as f64 + shared_targets as f64;
                if source_links.contains(&note.id) {
                    score += 3.0;
                }
                if note.links.contains(&source.note.id) {
                    score += 3.0;
                }
                if !note.color.is_empty() && note.color.eq_ignore_ascii_case(&source.note.color) {
                    score += 0.5;
                }
                (entry, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(self.effective_limit(limit))
            .map(|(entry, _)| entry.note.clone())
            .collect()
    }

    /// Merges `patch` into the standing filters applied to every search.
    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.filters.patch(patch);
        self.stats.filters_active = !self.filters.is_empty();
    }

    pub fn clear_filters(&mut self) {
        self.filters = SearchFilters::default();
        self.stats.filters_active = false;
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn stats(&self) -> IndexStats {
        self.stats.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: &str) -> Option<&IndexEntry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.entry(id).map(|entry| &entry.note)
    }

    /// Case-insensitive title lookup; duplicate titles resolve to the last
    /// indexed note.
    pub fn note_by_title(&self, title: &str) -> Option<&Note> {
        self.title_index
            .get(&title.to_lowercase())
            .and_then(|id| self.note(id))
    }

    pub fn notes_with_tag(&self, tag: &str) -> Vec<&Note> {
        let Some(tag) = normalize_tag(tag) else {
            return Vec::new();
        };
        self.lookup(self.tag_index.get(&tag))
    }

    pub fn notes_with_color(&self, color: &str) -> Vec<&Note> {
        self.lookup(self.color_index.get(&color.to_lowercase()))
    }

    /// Notes whose links reference `id`, in index order.
    pub fn referrers_of(&self, id: &str) -> Vec<&Note> {
        self.lookup(self.link_index.get(id))
    }

    fn lookup(&self, ids: Option<&Vec<NoteId>>) -> Vec<&Note> {
        ids.map(|ids| ids.iter().filter_map(|id| self.note(id)).collect())
            .unwrap_or_default()
    }

    fn compute_stats(&self) -> IndexStats {
        let mut tokens: HashSet<&str> = HashSet::new();
        for entry in &self.entries {
            tokens.extend(entry.title_tokens.iter().map(String::as_str));
            tokens.extend(entry.body_tokens.iter().map(String::as_str));
        }
        IndexStats {
            note_count: self.entries.len(),
            distinct_tokens: tokens.len(),
            tag_count: self.tag_index.len(),
            link_count: self.entries.iter().map(|e| e.note.links.len()).sum(),
            cache_entries: self.cache.len(),
            cache_evictions: self.cache.evictions(),
            filters_active: !self.filters.is_empty(),
            ..IndexStats::default()
        }
    }
}

/// Scores free-text terms against one entry.
fn score_terms(entry: &IndexEntry, terms: &[String], exact_title: &str) -> (f64, Vec<SearchMatch>) {
    let mut score = 0.0;
    let mut matches = Vec::new();
    let mut record = |field: MatchField, term: &str| {
        matches.push(SearchMatch {
            field,
            term: term.to_string(),
        });
    };

    for term in terms {
        let phrase = term.contains(' ');
        if entry.title_lower.contains(term.as_str()) {
            score += TITLE_SUBSTRING_SCORE;
            record(MatchField::Title, term);
        }
        let in_title_tokens = if phrase {
            entry.title_joined.contains(term.as_str())
        } else {
            entry.title_tokens.iter().any(|t| t.contains(term.as_str()))
        };
        if in_title_tokens {
            score += TITLE_TOKEN_SCORE;
        }
        let in_body = if phrase {
            entry.body_joined.contains(term.as_str())
        } else {
            entry.body_tokens.iter().any(|t| t.contains(term.as_str()))
        };
        if in_body {
            score += BODY_TOKEN_SCORE;
            record(MatchField::Body, term);
        }
        if entry.note.tags.iter().any(|tag| tag.contains(term.as_str())) {
            score += TAG_SCORE;
            record(MatchField::Tag, term);
        }
    }

    if !exact_title.is_empty() && exact_title == entry.title_lower {
        score += EXACT_TITLE_SCORE;
    }
    (score, matches)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// In-process change detector for `build_index`. `DefaultHasher` output is
/// not stable across Rust releases, so the value is never persisted.
fn collection_fingerprint(notes: &[Note]) -> u64 {
    let mut hasher = DefaultHasher::new();
    notes.len().hash(&mut hasher);
    for note in notes {
        note.hash(&mut hasher);
    }
    hasher.finish()
}

fn elapsed_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn hit_ratio(hits: usize, misses: usize) -> f64 {
    let lookups = hits + misses;
    if lookups == 0 {
        return 0.0;
    }
    hits as f64 / lookups as f64
}

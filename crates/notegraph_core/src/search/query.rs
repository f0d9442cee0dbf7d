//! Query string parsing and structured filter evaluation.
//!
//! # Responsibility
//! - Split a raw query into free text and filter directives
//!   (`tag:`, `after:`, `before:`, `links:>n`, `has:backlinks`).
//! - Apply filters as a narrowing pipeline over index candidates.
//!
//! # Invariants
//! - Parsing never fails; unrecognized directive values stay in free text
//!   or pass through as literal comparison strings.
//! - Multiple `tag:` directives match ANY of the listed tags.
//! - Filter order is tags, date range, min links, has-backlinks.

use crate::model::note::{normalize_tag, Note};
use crate::search::tokenize::{tokenize, unique_tokens};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)"|(\S+)"#).expect("valid query segment regex"));

/// Structured filters narrowing the candidate set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Normalized `#tag` values; a note passes when it has any of them.
    pub tags: Vec<String>,
    /// Inclusive lower bound on `Note::date_key`.
    pub date_from: Option<String>,
    /// Inclusive upper bound on `Note::date_key`.
    pub date_to: Option<String>,
    /// Minimum number of outgoing links.
    pub min_links: Option<usize>,
    pub has_backlinks: bool,
}

/// Partial filter update used by `SearchIndex::set_filters`.
///
/// `None` fields leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPatch {
    pub tags: Option<Vec<String>>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub min_links: Option<usize>,
    pub has_backlinks: Option<bool>,
}

/// Anything that exposes a note and its backlink count to the filter
/// pipeline.
pub trait FilterTarget {
    fn note(&self) -> &Note;
    fn backlink_count(&self) -> usize;
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.min_links.is_none()
            && !self.has_backlinks
    }

    /// Combines standing filters with per-query directives.
    ///
    /// Tags are unioned; scalar values from `overlay` win when present.
    pub fn merge(&self, overlay: &SearchFilters) -> SearchFilters {
        let mut tags = self.tags.clone();
        for tag in &overlay.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        SearchFilters {
            tags,
            date_from: overlay.date_from.clone().or_else(|| self.date_from.clone()),
            date_to: overlay.date_to.clone().or_else(|| self.date_to.clone()),
            min_links: overlay.min_links.or(self.min_links),
            has_backlinks: self.has_backlinks || overlay.has_backlinks,
        }
    }

    /// Applies a partial update in place.
    pub fn patch(&mut self, patch: FilterPatch) {
        if let Some(tags) = patch.tags {
            self.tags = tags.iter().filter_map(|tag| normalize_tag(tag)).collect();
        }
        if patch.date_from.is_some() {
            self.date_from = patch.date_from;
        }
        if patch.date_to.is_some() {
            self.date_to = patch.date_to;
        }
        if patch.min_links.is_some() {
            self.min_links = patch.min_links;
        }
        if let Some(flag) = patch.has_backlinks {
            self.has_backlinks = flag;
        }
    }

    /// Runs the filter pipeline; each stage only narrows `candidates`.
    pub fn apply<T: FilterTarget>(&self, mut candidates: Vec<T>) -> Vec<T> {
        if !self.tags.is_empty() {
            candidates.retain(|c| self.tags.iter().any(|tag| c.note().has_tag(tag)));
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            candidates.retain(|c| self.matches_date(c.note()));
        }
        if let Some(min_links) = self.min_links {
            candidates.retain(|c| c.note().links.len() >= min_links);
        }
        if self.has_backlinks {
            candidates.retain(|c| c.backlink_count() > 0);
        }
        candidates
    }

    fn matches_date(&self, note: &Note) -> bool {
        let date = note.date_key();
        if let Some(from) = self.date_from.as_deref() {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to.as_deref() {
            if date > to {
                return false;
            }
        }
        true
    }
}

/// Result of parsing a raw query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Free text with directives removed and quotes stripped.
    pub text_query: String,
    /// Scoring terms: single tokens, or space-joined tokens for phrases.
    pub terms: Vec<String>,
    pub filters: SearchFilters,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.filters.is_empty()
    }
}

/// Parses `raw` with date keywords resolved against the current UTC time.
pub fn parse_query(raw: &str) -> ParsedQuery {
    parse_query_at(raw, Utc::now())
}

/// Parses `raw` with date keywords resolved against `now`.
pub fn parse_query_at(raw: &str, now: DateTime<Utc>) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let mut text_parts: Vec<String> = Vec::new();
    let mut terms: Vec<String> = Vec::new();

    for caps in SEGMENT_RE.captures_iter(raw) {
        if let Some(phrase) = caps.get(1) {
            let phrase = phrase.as_str().trim();
            if phrase.is_empty() {
                continue;
            }
            text_parts.push(phrase.to_string());
            let joined = tokenize(phrase).join(" ");
            if !joined.is_empty() {
                terms.push(joined);
            }
            continue;
        }

        let Some(segment) = caps.get(2).map(|m| m.as_str()) else {
            continue;
        };
        if apply_directive(segment, now, &mut parsed.filters) {
            continue;
        }
        text_parts.push(segment.to_string());
        terms.extend(tokenize(segment));
    }

    parsed.text_query = text_parts.join(" ");
    parsed.terms = unique_tokens(terms);
    parsed
}

/// Consumes one directive segment; returns `false` when it is free text.
fn apply_directive(segment: &str, now: DateTime<Utc>, filters: &mut SearchFilters) -> bool {
    let Some((key, value)) = segment.split_once(':') else {
        return false;
    };
    match key.to_ascii_lowercase().as_str() {
        "tag" => match normalize_tag(value) {
            Some(tag) => {
                if !filters.tags.contains(&tag) {
                    filters.tags.push(tag);
                }
                true
            }
            None => false,
        },
        "after" if !value.is_empty() => {
            filters.date_from = Some(resolve_date(value, now));
            true
        }
        "before" if !value.is_empty() => {
            filters.date_to = Some(resolve_date(value, now));
            true
        }
        "links" => match parse_min_links(value) {
            Some(min) => {
                filters.min_links = Some(min);
                true
            }
            None => false,
        },
        "has" if value.eq_ignore_ascii_case("backlinks") => {
            filters.has_backlinks = true;
            true
        }
        _ => false,
    }
}

/// `>n` and a bare `n` both set an inclusive minimum of n outgoing links.
fn parse_min_links(value: &str) -> Option<usize> {
    let count = value.strip_prefix('>').unwrap_or(value);
    count.trim().parse::<usize>().ok()
}

/// Resolves relative date keywords to a UTC `YYYY-MM-DD` string.
///
/// Unknown values are returned unchanged and compared lexicographically.
pub fn resolve_date(value: &str, now: DateTime<Utc>) -> String {
    let days_back = match value.to_ascii_lowercase().as_str() {
        "today" => 0,
        "yesterday" => 1,
        "week" => 7,
        "month" => 30,
        _ => return value.to_string(),
    };
    (now - Duration::days(days_back))
        .format("%Y-%m-%d")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{parse_query_at, resolve_date, FilterPatch, FilterTarget, SearchFilters};
    use crate::model::note::Note;
    use chrono::{TimeZone, Utc};

    struct Candidate {
        note: Note,
        backlinks: usize,
    }

    impl FilterTarget for Candidate {
        fn note(&self) -> &Note {
            &self.note
        }

        fn backlink_count(&self) -> usize {
            self.backlinks
        }
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_query_parses_to_nothing() {
        let parsed = parse_query_at("   ", now());
        assert!(parsed.is_empty());
        assert_eq!(parsed.text_query, "");
    }

    #[test]
    fn directives_are_removed_from_free_text() {
        let parsed = parse_query_at(
            "rust tag:Lang after:week before:2024-12-31 links:>2 has:backlinks",
            now(),
        );
        assert_eq!(parsed.text_query, "rust");
        assert_eq!(parsed.terms, vec!["rust"]);
        assert_eq!(parsed.filters.tags, vec!["#lang"]);
        assert_eq!(parsed.filters.date_from.as_deref(), Some("2024-03-08"));
        assert_eq!(parsed.filters.date_to.as_deref(), Some("2024-12-31"));
        assert_eq!(parsed.filters.min_links, Some(2));
        assert!(parsed.filters.has_backlinks);
    }

    #[test]
    fn quoted_phrase_is_one_term() {
        let parsed = parse_query_at("\"Graph Theory\" intro", now());
        assert_eq!(parsed.text_query, "Graph Theory intro");
        assert_eq!(parsed.terms, vec!["graph theory", "intro"]);
    }

    #[test]
    fn malformed_directives_fall_back_to_text() {
        let parsed = parse_query_at("links:many tag: has:cats", now());
        assert!(parsed.filters.is_empty());
        assert_eq!(parsed.text_query, "links:many tag: has:cats");
    }

    #[test]
    fn date_keywords_resolve_relative_to_now() {
        assert_eq!(resolve_date("today", now()), "2024-03-15");
        assert_eq!(resolve_date("yesterday", now()), "2024-03-14");
        assert_eq!(resolve_date("month", now()), "2024-02-14");
        assert_eq!(resolve_date("someday", now()), "someday");
    }

    #[test]
    fn tag_filters_use_any_semantics() {
        let candidates = vec![
            Candidate {
                note: Note::new("1", "", "").with_tags(["#a"]),
                backlinks: 0,
            },
            Candidate {
                note: Note::new("2", "", "").with_tags(["#b"]),
                backlinks: 0,
            },
            Candidate {
                note: Note::new("3", "", "").with_tags(["#c"]),
                backlinks: 0,
            },
        ];
        let filters = parse_query_at("tag:a tag:b", now()).filters;
        let ids: Vec<String> = filters
            .apply(candidates)
            .into_iter()
            .map(|c| c.note.id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn pipeline_applies_links_and_backlinks() {
        let candidates = vec![
            Candidate {
                note: Note::new("1", "", "").with_links(["x", "y"]),
                backlinks: 0,
            },
            Candidate {
                note: Note::new("2", "", "").with_links(["x", "y", "z"]),
                backlinks: 1,
            },
        ];
        let filters = SearchFilters {
            min_links: Some(2),
            has_backlinks: true,
            ..SearchFilters::default()
        };
        let kept = filters.apply(candidates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].note.id, "2");
    }

    #[test]
    fn merge_unions_tags_and_overrides_scalars() {
        let mut standing = SearchFilters::default();
        standing.patch(FilterPatch {
            tags: Some(vec!["A".to_string()]),
            min_links: Some(1),
            ..FilterPatch::default()
        });
        let overlay = SearchFilters {
            tags: vec!["#b".to_string()],
            min_links: Some(4),
            ..SearchFilters::default()
        };
        let merged = standing.merge(&overlay);
        assert_eq!(merged.tags, vec!["#a", "#b"]);
        assert_eq!(merged.min_links, Some(4));
    }
}

use chrono::{TimeZone, Utc};
use notegraph_core::{FilterPatch, IndexConfig, MatchField, Note, SearchIndex};
use std::collections::BTreeSet;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

fn tagged_notes() -> Vec<Note> {
    vec![
        Note::new("n1", "First", "").with_tags(["#a"]),
        Note::new("n2", "Second", "").with_tags(["#b"]),
        Note::new("n3", "Third", "").with_tags(["#a", "#b"]),
    ]
}

fn ids(index: &SearchIndex, query: &str) -> BTreeSet<String> {
    index
        .search_at(query, 0, now())
        .into_iter()
        .map(|hit| hit.note.id)
        .collect()
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn rebuilding_same_collection_keeps_results_identical() {
    let notes = vec![
        Note::new("1", "Rust ownership", "borrowing and lifetimes").with_links(["2"]),
        Note::new("2", "Lifetimes", "rust borrow checker"),
        Note::new("3", "Gardening", "tomatoes"),
    ];
    let mut index = SearchIndex::default();
    index.build_index(&notes);
    let first = index.search_at("rust", 10, now());

    index.build_index(&notes);
    let second = index.search_at("rust", 10, now());

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert!(index.stats().last_build_skipped);
}

#[test]
fn tag_filters_combine_with_or_semantics() {
    let mut index = SearchIndex::default();
    index.build_index(&tagged_notes());

    assert_eq!(ids(&index, "tag:a"), set(&["n1", "n3"]));
    assert_eq!(ids(&index, "tag:a tag:b"), set(&["n1", "n2", "n3"]));
    assert_eq!(ids(&index, "tag:missing"), BTreeSet::new());
}

#[test]
fn exact_title_match_strictly_increases_score() {
    let notes = vec![
        Note::new("plain", "graph notes", "graph"),
        Note::new("exact", "graph", "graph"),
    ];
    let mut index = SearchIndex::default();
    index.build_index(&notes);

    let hits = index.search_at("graph", 10, now());
    assert_eq!(hits[0].note.id, "exact");
    assert!(hits[0].score > hits[1].score);
    assert!(hits[0]
        .matches
        .iter()
        .any(|m| m.field == MatchField::Title && m.term == "graph"));
}

#[test]
fn empty_and_blank_queries_return_nothing() {
    let mut index = SearchIndex::default();
    index.build_index(&tagged_notes());
    assert!(index.search_at("", 10, now()).is_empty());
    assert!(index.search_at("   ", 10, now()).is_empty());
}

#[test]
fn standing_filters_apply_until_cleared() {
    let mut index = SearchIndex::default();
    index.build_index(&tagged_notes());

    index.set_filters(FilterPatch {
        tags: Some(vec!["#b".to_string()]),
        ..FilterPatch::default()
    });
    assert!(index.stats().filters_active);
    assert_eq!(ids(&index, "second third first"), set(&["n2", "n3"]));

    index.clear_filters();
    assert_eq!(ids(&index, "second third first"), set(&["n1", "n2", "n3"]));
}

#[test]
fn recency_and_backlinks_boost_otherwise_equal_notes() {
    let notes = vec![
        Note::new("old", "topic", "").with_timestamps("2020-01-01T00:00:00Z", "2020-01-01T00:00:00Z"),
        Note::new("fresh", "topic", "").with_timestamps("2024-03-14T00:00:00Z", "2024-03-14T00:00:00Z"),
        Note::new("cited", "topic", ""),
        Note::new("citer", "unrelated", "").with_links(["cited"]),
    ];
    let mut index = SearchIndex::default();
    index.build_index(&notes);

    let hits = index.search_at("topic", 10, now());
    let score = |id: &str| {
        hits.iter()
            .find(|hit| hit.note.id == id)
            .map(|hit| hit.score)
            .unwrap()
    };
    assert!((score("fresh") / score("old") - 1.2).abs() < 1e-9);
    assert!((score("cited") / score("old") - 1.15).abs() < 1e-9);
}

#[test]
fn date_and_link_directives_narrow_candidates() {
    let notes = vec![
        Note::new("a", "alpha", "").with_timestamps("2024-03-01T00:00:00Z", "2024-03-10T08:00:00Z"),
        Note::new("b", "alpha", "")
            .with_links(["a", "c"])
            .with_timestamps("2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z"),
        Note::new("c", "alpha", ""),
    ];
    let mut index = SearchIndex::default();
    index.build_index(&notes);

    assert_eq!(ids(&index, "alpha after:2024-03-01"), set(&["a"]));
    assert_eq!(ids(&index, "alpha after:week"), set(&["a"]));
    assert_eq!(ids(&index, "alpha links:>1"), set(&["b"]));
    assert_eq!(ids(&index, "alpha has:backlinks"), set(&["a", "c"]));
    assert_eq!(ids(&index, "alpha after:someday"), BTreeSet::new());
}

#[test]
fn link_directive_minimum_is_inclusive() {
    let notes = vec![
        Note::new("two", "alpha", "").with_links(["x", "y"]),
        Note::new("three", "alpha", "").with_links(["x", "y", "z"]),
        Note::new("one", "alpha", "").with_links(["x"]),
    ];
    let mut index = SearchIndex::default();
    index.build_index(&notes);

    assert_eq!(ids(&index, "alpha links:>2"), set(&["two", "three"]));
    assert_eq!(ids(&index, "alpha links:2"), set(&["two", "three"]));
    assert_eq!(ids(&index, "alpha links:>3"), set(&["three"]));
}

#[test]
fn tag_completion_and_related_notes() {
    let notes = vec![
        Note::new("1", "Rust", "").with_tags(["#rust", "#lang"]).with_links(["2"]),
        Note::new("2", "Cargo", "").with_tags(["#rust"]),
        Note::new("3", "Python", "").with_tags(["#lang", "#python"]),
        Note::new("4", "Recipes", "").with_tags(["#food"]),
    ];
    let mut index = SearchIndex::default();
    index.build_index(&notes);

    assert_eq!(index.search_by_tag("la", 10), vec!["#lang".to_string()]);
    assert_eq!(
        index.search_by_tag("#", 2),
        vec!["#lang".to_string(), "#rust".to_string()]
    );

    let related: Vec<String> = index
        .related_notes("1", 10)
        .into_iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(related, vec!["2".to_string(), "3".to_string()]);
    assert!(index.related_notes("missing", 10).is_empty());
}

#[test]
fn token_cache_is_reused_across_changed_collections() {
    let mut index = SearchIndex::new(IndexConfig {
        cache_capacity: 10,
        ..IndexConfig::default()
    });
    let stable = Note::new("1", "stable", "").with_timestamps("", "2024-01-01T00:00:00Z");
    index.build_index(&[stable.clone()]);
    assert_eq!(index.stats().cache_misses, 1);

    let added = Note::new("2", "added", "").with_timestamps("", "2024-01-02T00:00:00Z");
    index.build_index(&[stable, added]);
    let stats = index.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.note_count, 2);
    assert!(!stats.last_build_skipped);
    assert!((stats.cache_hit_ratio - 0.5).abs() < 1e-9);
    assert_eq!(stats.cache_evictions, 0);
}

#[test]
fn cache_stats_report_hit_ratio_and_evictions() {
    let mut index = SearchIndex::new(IndexConfig {
        cache_capacity: 2,
        ..IndexConfig::default()
    });
    assert_eq!(index.stats().cache_hit_ratio, 0.0);

    let notes: Vec<Note> = ["1", "2", "3"]
        .into_iter()
        .map(|id| Note::new(id, "topic", "").with_timestamps("", "2024-01-01T00:00:00Z"))
        .collect();
    index.build_index(&notes);
    let stats = index.stats();
    assert_eq!(stats.cache_misses, 3);
    assert_eq!(stats.cache_hit_ratio, 0.0);
    assert_eq!(stats.cache_entries, 2);
    assert_eq!(stats.cache_evictions, 1);

    index.build_index(&notes[1..]);
    let stats = index.stats();
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(stats.cache_hit_ratio, 1.0);
    assert_eq!(stats.cache_evictions, 1);
}

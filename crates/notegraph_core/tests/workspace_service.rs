use chrono::{TimeZone, Utc};
use notegraph_core::db::open_db_in_memory;
use notegraph_core::{
    InMemoryNoteStore, Note, NoteStore, NoteWorkspace, NotegraphConfig, RepoError, RepoResult,
    SqliteNoteStore, WorkspaceError,
};

#[test]
fn save_resolves_wiki_links_by_title_and_id() {
    let mut workspace = NoteWorkspace::new(InMemoryNoteStore::new(), &NotegraphConfig::default());
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    workspace
        .save_note_at(Note::new("g", "Graph Theory", "basics"), now)
        .unwrap();
    workspace
        .save_note_at(Note::new("t", "Trees", "acyclic"), now)
        .unwrap();

    let saved = workspace
        .save_note_at(
            Note::new(
                "c",
                "Cycles",
                "see [[graph theory]], [[t|the trees note]], [[Missing]] and [[Cycles]]",
            )
            .with_links(["external"]),
            now,
        )
        .unwrap();

    assert_eq!(
        saved.links,
        vec!["external".to_string(), "g".to_string(), "t".to_string()]
    );
    assert_eq!(saved.created_at, "2024-05-01T09:30:00.000Z");
    assert_eq!(saved.updated_at, saved.created_at);
    assert_eq!(workspace.get_note("c").unwrap(), Some(saved));
}

#[test]
fn resave_keeps_created_at_and_refreshes_index() {
    let mut workspace = NoteWorkspace::new(InMemoryNoteStore::new(), &NotegraphConfig::default());
    let first = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap();

    let note = workspace
        .save_note_at(Note::new("n", "Draft", "rough idea"), first)
        .unwrap();
    assert_eq!(workspace.search_at("rough", 10, later).unwrap().len(), 1);

    let mut edited = note.clone();
    edited.body = "polished idea".to_string();
    edited.created_at.clear();
    let edited = workspace.save_note_at(edited, later).unwrap();

    assert_eq!(edited.created_at, note.created_at);
    assert_ne!(edited.updated_at, note.updated_at);
    assert!(workspace.search_at("rough", 10, later).unwrap().is_empty());
    assert_eq!(workspace.search_at("polished", 10, later).unwrap().len(), 1);
}

#[test]
fn workspace_over_sqlite_reports_metrics_and_insights() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteNoteStore::try_new(&mut conn).unwrap();
    let mut workspace = NoteWorkspace::new(store, &NotegraphConfig::default());

    let root = workspace.create_note("Root", "start here", &["#hub"]).unwrap();
    for title in ["Leaf A", "Leaf B", "Leaf C", "Leaf D"] {
        workspace
            .create_note(title, "see [[Root]]", &["#leaf"])
            .unwrap();
    }

    let metrics = workspace.metrics().unwrap();
    assert_eq!(metrics.node_count, 5);
    assert_eq!(metrics.total_edges, 4);
    assert_eq!(metrics.authorities[0].id, root.id);

    let insights = workspace.insights().unwrap();
    assert!(!insights.is_empty());
    assert_eq!(workspace.search_by_tag("le", 5).unwrap(), vec!["#leaf".to_string()]);
    assert_eq!(workspace.related_notes(&root.id, 10).unwrap().len(), 4);
    assert_eq!(workspace.stats().unwrap().note_count, 5);
    assert_eq!(workspace.store().get_all_notes().unwrap().len(), 5);
}

#[test]
fn missing_notes_surface_as_not_found() {
    let mut workspace = NoteWorkspace::new(InMemoryNoteStore::new(), &NotegraphConfig::default());
    assert!(matches!(
        workspace.delete_note("nope"),
        Err(WorkspaceError::NoteNotFound(id)) if id == "nope"
    ));
    assert!(matches!(
        workspace.related_notes("nope", 5),
        Err(WorkspaceError::NoteNotFound(_))
    ));
}

/// Store whose backend is unreachable.
struct OfflineStore;

impl NoteStore for OfflineStore {
    fn get_all_notes(&self) -> RepoResult<Vec<Note>> {
        Err(RepoError::InvalidData("backend offline".to_string()))
    }

    fn get_note(&self, _id: &str) -> RepoResult<Option<Note>> {
        Err(RepoError::InvalidData("backend offline".to_string()))
    }

    fn upsert_note(&mut self, _note: &Note) -> RepoResult<()> {
        Err(RepoError::InvalidData("backend offline".to_string()))
    }

    fn delete_note(&mut self, _id: &str) -> RepoResult<()> {
        Err(RepoError::InvalidData("backend offline".to_string()))
    }
}

#[test]
fn list_notes_pages_through_the_store() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteNoteStore::try_new(&mut conn).unwrap();
    let mut workspace = NoteWorkspace::new(store, &NotegraphConfig::default());
    for (id, title) in [("a", "Alpha"), ("b", "Beta"), ("c", "Gamma")] {
        workspace.save_note(Note::new(id, title, "")).unwrap();
    }

    let page: Vec<String> = workspace
        .list_notes(2, 1)
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(page, vec!["b", "c"]);
    assert!(workspace.list_notes(5, 3).unwrap().is_empty());
}

#[test]
fn health_check_tracks_index_freshness_and_store_reachability() {
    let mut workspace = NoteWorkspace::new(InMemoryNoteStore::new(), &NotegraphConfig::default());
    workspace.save_note(Note::new("a", "Alpha", "graph")).unwrap();

    let health = workspace.health_check();
    assert!(health.healthy);
    assert_eq!(health.note_count, 1);
    assert!(!health.index_fresh);

    workspace.search("graph", 5).unwrap();
    let health = workspace.health_check();
    assert!(health.index_fresh);
    assert_eq!(health.cache_hit_ratio, 0.0);

    let offline = NoteWorkspace::new(OfflineStore, &NotegraphConfig::default());
    let health = offline.health_check();
    assert!(!health.healthy);
    assert_eq!(health.note_count, 0);
}

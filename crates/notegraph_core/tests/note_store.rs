use notegraph_core::db::open_db_in_memory;
use notegraph_core::{
    open_db, InMemoryNoteStore, Note, NoteStore, NoteValidationError, RepoError, SqliteNoteStore,
};
use rusqlite::Connection;

fn sample() -> Vec<Note> {
    vec![
        Note::new("b", "Beta", "second body")
            .with_tags(["#zeta", "#alpha"])
            .with_links(["a", "ghost"])
            .with_color("red")
            .with_timestamps("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"),
        Note::new("a", "Alpha", "first body"),
    ]
}

fn exercise_store(store: &mut impl NoteStore) {
    for note in sample() {
        store.upsert_note(&note).unwrap();
    }

    let all = store.get_all_notes().unwrap();
    assert_eq!(all, sample());

    let mut updated = sample()[0].clone();
    updated.title = "Beta v2".to_string();
    updated.tags = vec!["#alpha".to_string()];
    updated.links = vec![];
    store.upsert_note(&updated).unwrap();

    let all = store.get_all_notes().unwrap();
    assert_eq!(all[0].id, "b");
    assert_eq!(all[0].title, "Beta v2");
    assert_eq!(all[0].tags, vec!["#alpha".to_string()]);
    assert!(all[0].links.is_empty());
    assert_eq!(store.get_note("b").unwrap(), Some(updated));

    assert!(store.get_note("missing").unwrap().is_none());
    store.delete_note("b").unwrap();
    assert!(matches!(
        store.delete_note("b"),
        Err(RepoError::NotFound(id)) if id == "b"
    ));
    assert_eq!(store.get_all_notes().unwrap().len(), 1);

    let self_linked = Note::new("c", "C", "").with_links(["c"]);
    assert!(matches!(
        store.upsert_note(&self_linked),
        Err(RepoError::Validation(NoteValidationError::SelfLink(_)))
    ));
}

fn exercise_pagination(store: &mut impl NoteStore) {
    for id in ["n1", "n2", "n3", "n4", "n5"] {
        let note = Note::new(id, id.to_uppercase(), "").with_tags(["#page"]);
        store.upsert_note(&note).unwrap();
    }
    let page_ids = |limit, offset| -> Vec<String> {
        store
            .get_notes_page(limit, offset)
            .unwrap()
            .into_iter()
            .map(|note| note.id)
            .collect()
    };

    assert_eq!(page_ids(2, 0), vec!["n1", "n2"]);
    assert_eq!(page_ids(2, 2), vec!["n3", "n4"]);
    assert_eq!(page_ids(2, 4), vec!["n5"]);
    assert!(page_ids(2, 9).is_empty());
    assert!(page_ids(0, 0).is_empty());
    assert_eq!(page_ids(usize::MAX, 3), vec!["n4", "n5"]);
    assert_eq!(store.get_notes_page(1, 1).unwrap()[0].tags, vec!["#page"]);
    assert_eq!(store.count_notes().unwrap(), 5);
}

#[test]
fn in_memory_store_pages_in_insertion_order() {
    exercise_pagination(&mut InMemoryNoteStore::new());
}

#[test]
fn sqlite_store_pages_in_insertion_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    exercise_pagination(&mut store);
}

#[test]
fn in_memory_store_round_trips_notes() {
    let mut store = InMemoryNoteStore::new();
    exercise_store(&mut store);
    assert_eq!(store.len(), 1);
}

#[test]
fn sqlite_store_round_trips_notes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    exercise_store(&mut store);
}

#[test]
fn sqlite_delete_cascades_tags_and_links_but_keeps_referrers() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
        for note in sample() {
            store.upsert_note(&note).unwrap();
        }
        assert_eq!(store.referrer_ids("a").unwrap(), vec!["b".to_string()]);
        store.delete_note("b").unwrap();
        assert!(store.referrer_ids("a").unwrap().is_empty());
    }

    let orphan_rows: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM note_tags) + (SELECT COUNT(*) FROM note_links);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphan_rows, 0);
}

#[test]
fn sqlite_store_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    {
        let mut conn = open_db(&path).unwrap();
        let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
        for note in sample() {
            store.upsert_note(&note).unwrap();
        }
    }

    let mut conn = open_db(&path).unwrap();
    let store = SqliteNoteStore::try_new(&mut conn).unwrap();
    assert_eq!(store.get_all_notes().unwrap(), sample());
}

#[test]
fn sqlite_store_rejects_unmigrated_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteNoteStore::try_new(&mut conn),
        Err(RepoError::MissingRequiredTable("notes"))
    ));
}

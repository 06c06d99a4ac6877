//! Local store behavior for both backends

use compare_brief::brief::{Brief, make_demo_brief, pad_with_unknown};
use compare_brief::store::{BriefStore, JsonFileStore, MemoryStore};

fn brief(query: &str) -> Brief {
    make_demo_brief(query, "", &pad_with_unknown(vec![]))
}

#[test]
fn missing_id_is_not_found() {
    let store = MemoryStore::new();
    assert!(store.get("xyz123").is_none());

    let dir = tempfile::tempdir().unwrap();
    let file_store = JsonFileStore::new(dir.path().join("history.json"));
    assert!(file_store.get("xyz123").is_none());
    assert!(file_store.list().is_empty());
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("history.json");

    let first_id;
    let second_id;
    {
        let store = JsonFileStore::new(&path);
        first_id = store.save(brief("first question"));
        second_id = store.save(brief("second question"));
    }

    let reopened = JsonFileStore::new(&path);
    assert_eq!(
        reopened.get(&first_id).map(|b| b.query),
        Some("first question".to_string())
    );
    let order: Vec<String> = reopened.list().into_iter().map(|e| e.id).collect();
    assert_eq!(order, vec![second_id.clone(), first_id.clone()]);

    assert!(reopened.remove(&first_id));
    assert!(JsonFileStore::new(&path).get(&first_id).is_none());
    assert!(!reopened.insert(&first_id, brief("again")));

    reopened.clear();
    assert!(JsonFileStore::new(&path).list().is_empty());
}

#[test]
fn corrupt_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = JsonFileStore::new(&path);
    assert!(store.list().is_empty());
    let id = store.save(brief("recovered"));
    assert!(store.get(&id).is_some());
}

#[test]
fn write_failures_are_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the document should be: reads and renames both fail.
    let path = dir.path().join("history");
    std::fs::create_dir(&path).unwrap();

    let store = JsonFileStore::new(&path);
    let id = store.save(brief("lost"));
    assert!(!id.is_empty());
    assert!(store.get(&id).is_none());
    assert!(!store.remove(&id));
    store.clear();
    assert!(!dir.path().join("history.json.tmp").exists());
}

#[test]
fn recent_limits_history() {
    let store = MemoryStore::new();
    for i in 0..5 {
        store.save(brief(&format!("q{i}")));
    }
    let recent: Vec<String> = store
        .recent(3)
        .into_iter()
        .map(|e| e.brief.query)
        .collect();
    assert_eq!(recent, vec!["q4", "q3", "q2"]);
}

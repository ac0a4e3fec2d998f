use std::sync::{Arc, Barrier};
use std::thread;

use inkwell_common::outcome::UpdateOutcome;
use inkwell_common::types::PrincipalId;
use inkwell_core::error::StoreError;
use inkwell_core::store::VersionedStore;
use rusqlite::{params, Connection};
use tempfile::tempdir;

fn alice() -> PrincipalId {
    PrincipalId::new("alice")
}

fn bob() -> PrincipalId {
    PrincipalId::new("bob")
}

#[test]
fn edits_and_history_survive_reopen() {
    let tmp = tempdir().expect("tempdir should be created");
    let db_path = tmp.path().join("data").join("inkwell.db");

    let id = {
        let store = VersionedStore::open_sqlite(&db_path).expect("store should open");
        let doc = store.create("Hello", "World", &alice()).unwrap();
        assert!(store.update(doc.id, 1, "World!", &alice()).unwrap().is_accepted());
        assert!(!store.update(doc.id, 1, "World?", &bob()).unwrap().is_accepted());
        assert!(store.update(doc.id, 2, "World?", &bob()).unwrap().is_accepted());
        doc.id
    };

    let reopened = VersionedStore::open_sqlite(&db_path).expect("store should reopen");
    let doc = reopened.read(id).unwrap();
    assert_eq!(doc.version, 3);
    assert_eq!(doc.content, "World?");
    assert!(doc.updated_at >= doc.created_at);

    let history = reopened.audit().history(id).unwrap();
    let summary: Vec<_> =
        history.iter().map(|r| (r.version, r.editor_id.as_str(), r.content.as_str())).collect();
    assert_eq!(summary, vec![(2, "alice", "World!"), (3, "bob", "World?")]);
    assert!(reopened.audit().verify(id).unwrap().is_intact());
}

#[test]
fn delete_leaves_no_orphan_revisions() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("inkwell.db");
    let store = VersionedStore::open_sqlite(&db_path).unwrap();

    let doc = store.create("Hello", "World", &alice()).unwrap();
    let keep = store.create("Other", "Doc", &alice()).unwrap();
    for version in 1..=4 {
        store.update(doc.id, version, &format!("rev {version}"), &bob()).unwrap();
    }
    store.update(keep.id, 1, "kept", &bob()).unwrap();

    let receipt = store.delete(doc.id, &alice()).unwrap();
    assert_eq!(receipt.revisions_removed, 4);

    let raw = Connection::open(&db_path).unwrap();
    let orphans: i64 = raw
        .query_row(
            "SELECT COUNT(*) FROM revisions WHERE document_id = ?1",
            params![doc.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);

    assert_eq!(store.audit().history(keep.id).unwrap().len(), 1);
}

#[test]
fn stores_on_one_file_cannot_both_win_a_version() {
    const WRITERS: usize = 6;

    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("inkwell.db");
    let doc = VersionedStore::open_sqlite(&db_path).unwrap().create("Race", "start", &alice()).unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|n| {
            let db_path = db_path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                // Separate connection per writer.
                let store = VersionedStore::open_sqlite(&db_path).expect("store should open");
                barrier.wait();
                store
                    .update(doc.id, 1, &format!("writer {n}"), &PrincipalId::new(format!("w{n}")))
                    .expect("update should not error")
            })
        })
        .collect();

    let outcomes: Vec<UpdateOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = outcomes.iter().filter(|o| o.is_accepted()).collect();
    assert_eq!(winners.len(), 1);

    for outcome in &outcomes {
        if let UpdateOutcome::Conflict { current, .. } = outcome {
            assert_eq!(current.version, 2);
        }
    }

    let store = VersionedStore::open_sqlite(&db_path).unwrap();
    let current = store.read(doc.id).unwrap();
    assert_eq!(current.version, 2);
    assert_eq!(&current, winners[0].document());
    assert_eq!(store.audit().history(doc.id).unwrap().len(), 1);
}

#[test]
fn revisions_cannot_be_updated_in_place() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("inkwell.db");
    let store = VersionedStore::open_sqlite(&db_path).unwrap();
    let doc = store.create("Hello", "World", &alice()).unwrap();
    store.update(doc.id, 1, "World!", &alice()).unwrap();

    let raw = Connection::open(&db_path).unwrap();
    let error = raw
        .execute("UPDATE revisions SET content = 'forged' WHERE document_id = ?1", params![doc.id.to_string()])
        .expect_err("append-only trigger should reject updates");
    assert!(error.to_string().contains("append-only"));
}

#[test]
fn verify_reports_tampered_revision() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("inkwell.db");
    let store = VersionedStore::open_sqlite(&db_path).unwrap();
    let doc = store.create("Hello", "World", &alice()).unwrap();
    store.update(doc.id, 1, "two", &alice()).unwrap();
    store.update(doc.id, 2, "three", &bob()).unwrap();
    store.update(doc.id, 3, "four", &alice()).unwrap();

    let raw = Connection::open(&db_path).unwrap();
    raw.execute_batch("DROP TRIGGER revisions_append_only;").unwrap();
    raw.execute(
        "UPDATE revisions SET content = 'forged' WHERE document_id = ?1 AND version = 3",
        params![doc.id.to_string()],
    )
    .unwrap();

    let report = store.audit().verify(doc.id).unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.first_broken_version, Some(3));
}

#[test]
fn backdated_revision_is_reported_after_reopen() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("inkwell.db");
    let doc = {
        let store = VersionedStore::open_sqlite(&db_path).unwrap();
        let doc = store.create("Hello", "World", &alice()).unwrap();
        store.update(doc.id, 1, "two", &alice()).unwrap();
        store.update(doc.id, 2, "three", &bob()).unwrap();
        doc
    };

    let store = VersionedStore::open_sqlite(&db_path).unwrap();
    assert!(store.audit().verify(doc.id).unwrap().is_intact());

    let raw = Connection::open(&db_path).unwrap();
    raw.execute_batch("DROP TRIGGER revisions_append_only;").unwrap();
    raw.execute(
        "UPDATE revisions SET updated_at = '2000-01-01T00:00:00.000000Z' \
         WHERE document_id = ?1 AND version = 3",
        params![doc.id.to_string()],
    )
    .unwrap();

    let history = store.audit().history(doc.id).unwrap();
    assert_eq!(history[0].version, 3);
    let report = store.audit().verify(doc.id).unwrap();
    assert_eq!(report.first_broken_version, Some(3));
}

#[test]
fn forbidden_delete_reports_requestor() {
    let tmp = tempdir().unwrap();
    let store = VersionedStore::open_sqlite(tmp.path().join("inkwell.db")).unwrap();
    let doc = store.create("Hello", "World", &alice()).unwrap();

    match store.delete(doc.id, &bob()) {
        Err(StoreError::Forbidden { id, requestor }) => {
            assert_eq!(id, doc.id);
            assert_eq!(requestor, bob());
        }
        other => panic!("expected forbidden, got {other:?}"),
    }
    assert_eq!(store.read(doc.id).unwrap(), doc);
}

// `documents` table access.
//
// `content` and `version` change only through `compare_and_swap`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use inkwell_common::types::{Document, DocumentId, PrincipalId};
use rusqlite::{params, Connection, OptionalExtension};

use super::{decode_timestamp, decode_uuid, encode_timestamp};

const SELECT_COLUMNS: &str =
    "SELECT id, title, content, version, author_id, created_at, updated_at FROM documents";

pub fn insert(conn: &Connection, document: &Document) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (id, title, content, version, author_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            document.id.to_string(),
            document.title,
            document.content,
            document.version,
            document.author_id.as_str(),
            encode_timestamp(document.created_at),
            encode_timestamp(document.updated_at),
        ],
    )
    .context("failed to insert document row")?;
    Ok(())
}

pub fn get(conn: &Connection, id: DocumentId) -> Result<Option<Document>> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id.to_string()],
        row_to_document,
    )
    .optional()
    .context("failed to query document by id")
}

/// All documents, newest first.
pub fn list(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))
        .context("failed to prepare document list query")?;

    let rows = stmt.query_map([], row_to_document).context("failed to query documents")?;

    rows.collect::<std::result::Result<Vec<_>, _>>().context("failed to collect document rows")
}

/// Replace content and bump the version only if the stored version still
/// equals `expected_version`. Returns `false` when nothing matched, which is
/// either a stale version or a missing row.
pub fn compare_and_swap(
    conn: &Connection,
    id: DocumentId,
    expected_version: i64,
    content: &str,
    updated_at: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE documents \
             SET content = ?1, version = version + 1, updated_at = ?2 \
             WHERE id = ?3 AND version = ?4",
            params![content, encode_timestamp(updated_at), id.to_string(), expected_version],
        )
        .context("failed to apply version-checked document update")?;
    Ok(changed == 1)
}

pub fn delete(conn: &Connection, id: DocumentId) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
        .context("failed to delete document row")?;
    Ok(changed > 0)
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let author: String = row.get(4)?;
    Ok(Document {
        id: DocumentId(decode_uuid(row, 0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        version: row.get(3)?,
        author_id: PrincipalId::new(author),
        created_at: decode_timestamp(row, 5)?,
        updated_at: decode_timestamp(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::meta_db::MetaDb;
    use crate::store::now;

    fn setup() -> (MetaDb, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = MetaDb::open(dir.path().join("inkwell.db")).expect("db should open");
        (db, dir)
    }

    fn doc(title: &str) -> Document {
        let created = now();
        Document {
            id: DocumentId::new(),
            title: title.into(),
            content: "body".into(),
            version: 1,
            author_id: PrincipalId::new("alice"),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn insert_and_get_roundtrips_every_column() {
        let (db, _dir) = setup();
        let row = doc("Hello");

        insert(db.connection(), &row).expect("insert should succeed");
        let loaded = get(db.connection(), row.id).expect("query should succeed");

        assert_eq!(loaded, Some(row));
    }

    #[test]
    fn compare_and_swap_only_matches_current_version() {
        let (db, _dir) = setup();
        let row = doc("Hello");
        insert(db.connection(), &row).unwrap();

        assert!(!compare_and_swap(db.connection(), row.id, 2, "stale", now()).unwrap());
        assert!(compare_and_swap(db.connection(), row.id, 1, "fresh", now()).unwrap());
        assert!(!compare_and_swap(db.connection(), row.id, 1, "again", now()).unwrap());

        let loaded = get(db.connection(), row.id).unwrap().expect("row should exist");
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.content, "fresh");
    }

    #[test]
    fn compare_and_swap_on_missing_row_changes_nothing() {
        let (db, _dir) = setup();
        assert!(!compare_and_swap(db.connection(), DocumentId::new(), 1, "x", now()).unwrap());
    }

    #[test]
    fn list_returns_newest_first() {
        let (db, _dir) = setup();
        let mut older = doc("older");
        older.created_at = older.created_at - chrono::Duration::seconds(5);
        let newer = doc("newer");
        insert(db.connection(), &older).unwrap();
        insert(db.connection(), &newer).unwrap();

        let titles: Vec<_> =
            list(db.connection()).unwrap().into_iter().map(|document| document.title).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }
}

// `revisions` table access: append, ordered read, cascade removal.

use anyhow::{Context, Result};
use inkwell_common::types::{DocumentId, PrincipalId, Revision};
use rusqlite::{params, Connection, OptionalExtension};

use super::{decode_timestamp, decode_uuid, encode_timestamp};

pub fn append(conn: &Connection, revision: &Revision) -> Result<()> {
    conn.execute(
        "INSERT INTO revisions \
         (id, document_id, content, editor_id, version, updated_at, chain_hash) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            revision.id.to_string(),
            revision.document_id.to_string(),
            revision.content,
            revision.editor_id.as_str(),
            revision.version,
            encode_timestamp(revision.updated_at),
            revision.chain_hash,
        ],
    )
    .context("failed to append revision row")?;
    Ok(())
}

/// History of one document, oldest first.
pub fn list_for_document(conn: &Connection, document_id: DocumentId) -> Result<Vec<Revision>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, document_id, content, editor_id, version, updated_at, chain_hash \
             FROM revisions \
             WHERE document_id = ?1 \
             ORDER BY updated_at ASC, version ASC",
        )
        .context("failed to prepare revision history query")?;

    let rows = stmt
        .query_map(params![document_id.to_string()], row_to_revision)
        .context("failed to query revision history")?;

    rows.collect::<std::result::Result<Vec<_>, _>>().context("failed to collect revision rows")
}

/// Chain hash of the highest version recorded for a document.
pub fn latest_chain_hash(conn: &Connection, document_id: DocumentId) -> Result<Option<String>> {
    conn.query_row(
        "SELECT chain_hash FROM revisions WHERE document_id = ?1 ORDER BY version DESC LIMIT 1",
        params![document_id.to_string()],
        |row| row.get(0),
    )
    .optional()
    .context("failed to read latest revision hash")
}

pub fn delete_for_document(conn: &Connection, document_id: DocumentId) -> Result<u64> {
    let removed = conn
        .execute("DELETE FROM revisions WHERE document_id = ?1", params![document_id.to_string()])
        .context("failed to delete revisions for document")?;
    Ok(removed as u64)
}

fn row_to_revision(row: &rusqlite::Row<'_>) -> rusqlite::Result<Revision> {
    let editor: String = row.get(3)?;
    Ok(Revision {
        id: decode_uuid(row, 0)?,
        document_id: DocumentId(decode_uuid(row, 1)?),
        content: row.get(2)?,
        editor_id: PrincipalId::new(editor),
        version: row.get(4)?,
        updated_at: decode_timestamp(row, 5)?,
        chain_hash: row.get(6)?,
    })
}

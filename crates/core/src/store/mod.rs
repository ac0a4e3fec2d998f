// Versioned document store: optimistic concurrency over SQLite or memory.
//
// An update is one compare-and-swap on `version`. The check, the revision
// append and the content write share one IMMEDIATE transaction, so two
// writers holding the same expected version can never both win.

pub mod documents;
pub(crate) mod memory;
pub mod meta_db;
pub mod revisions;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use inkwell_common::outcome::{DeleteReceipt, UpdateOutcome};
use inkwell_common::types::{Document, DocumentId, PrincipalId, Revision};
use rusqlite::types::Type;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::{self, AuditLog};
use crate::error::StoreError;
use memory::{MemoryDelete, MemoryStore, MemoryUpdate};
use meta_db::MetaDb;

pub struct VersionedStore {
    backend: Backend,
}

enum Backend {
    Sqlite(Mutex<MetaDb>),
    Memory(Mutex<MemoryStore>),
}

impl VersionedStore {
    /// Open (and migrate) a SQLite database file.
    pub fn open_sqlite(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = MetaDb::open(path)?;
        info!(path = %path.display(), "document store opened");
        Ok(Self { backend: Backend::Sqlite(Mutex::new(db)) })
    }

    pub fn in_memory() -> Self {
        Self { backend: Backend::Memory(Mutex::new(MemoryStore::default())) }
    }

    pub fn create(
        &self,
        title: &str,
        content: &str,
        author: &PrincipalId,
    ) -> Result<Document, StoreError> {
        require_text("title", title)?;
        require_text("content", content)?;

        let created_at = now();
        let document = Document {
            id: DocumentId::new(),
            title: title.to_owned(),
            content: content.to_owned(),
            version: 1,
            author_id: author.clone(),
            created_at,
            updated_at: created_at,
        };

        match &self.backend {
            Backend::Sqlite(db) => documents::insert(lock(db)?.connection(), &document)?,
            Backend::Memory(store) => lock(store)?.insert(document.clone()),
        }

        info!(doc_id = %document.id, author = %author, "document created");
        Ok(document)
    }

    pub fn read(&self, id: DocumentId) -> Result<Document, StoreError> {
        let found = match &self.backend {
            Backend::Sqlite(db) => documents::get(lock(db)?.connection(), id)?,
            Backend::Memory(store) => lock(store)?.get(id),
        };
        found.ok_or(StoreError::NotFound { id })
    }

    /// Every document, newest first.
    pub fn list(&self) -> Result<Vec<Document>, StoreError> {
        match &self.backend {
            Backend::Sqlite(db) => Ok(documents::list(lock(db)?.connection())?),
            Backend::Memory(store) => Ok(lock(store)?.list()),
        }
    }

    /// Apply `new_content` if the document is still at `expected_version`.
    ///
    /// A stale version yields `UpdateOutcome::Conflict` carrying the current
    /// document and the caller's draft; nothing is written in that case.
    pub fn update(
        &self,
        id: DocumentId,
        expected_version: i64,
        new_content: &str,
        editor: &PrincipalId,
    ) -> Result<UpdateOutcome, StoreError> {
        let now = now();
        let outcome = match &self.backend {
            Backend::Sqlite(db) => update_sqlite(
                lock(db)?.connection_mut(),
                id,
                expected_version,
                new_content,
                editor,
                now,
            )?,
            Backend::Memory(store) => {
                match lock(store)?.compare_and_swap(id, expected_version, new_content, editor, now) {
                    MemoryUpdate::Accepted(document) => UpdateOutcome::Accepted { document },
                    MemoryUpdate::Stale(current) => UpdateOutcome::Conflict {
                        current,
                        attempted_content: new_content.to_owned(),
                    },
                    MemoryUpdate::Missing => return Err(StoreError::NotFound { id }),
                }
            }
        };

        match &outcome {
            UpdateOutcome::Accepted { document } => {
                info!(doc_id = %id, version = document.version, editor = %editor, "document update accepted");
            }
            UpdateOutcome::Conflict { current, .. } => {
                info!(
                    doc_id = %id,
                    expected_version,
                    current_version = current.version,
                    editor = %editor,
                    "document update rejected: stale version"
                );
            }
        }
        Ok(outcome)
    }

    /// Remove a document and its whole history. Only the author may.
    pub fn delete(
        &self,
        id: DocumentId,
        requestor: &PrincipalId,
    ) -> Result<DeleteReceipt, StoreError> {
        let revisions_removed = match &self.backend {
            Backend::Sqlite(db) => delete_sqlite(lock(db)?.connection_mut(), id, requestor)?,
            Backend::Memory(store) => match lock(store)?.delete(id, requestor) {
                MemoryDelete::Deleted { revisions_removed } => revisions_removed,
                MemoryDelete::NotAuthor => {
                    return Err(StoreError::Forbidden { id, requestor: requestor.clone() })
                }
                MemoryDelete::Missing => return Err(StoreError::NotFound { id }),
            },
        };

        info!(doc_id = %id, requestor = %requestor, revisions_removed, "document deleted");
        Ok(DeleteReceipt { id, revisions_removed })
    }

    /// Read-only view over the revision history.
    pub fn audit(&self) -> AuditLog<'_> {
        AuditLog::new(self)
    }

    pub(crate) fn history(&self, id: DocumentId) -> Result<Vec<Revision>, StoreError> {
        let history = match &self.backend {
            Backend::Sqlite(db) => history_sqlite(lock(db)?.connection_mut(), id)?,
            Backend::Memory(store) => lock(store)?.history(id),
        };
        debug!(doc_id = %id, found = history.is_some(), "history loaded");
        history.ok_or(StoreError::NotFound { id })
    }

    #[cfg(test)]
    pub(crate) fn with_memory<R>(&self, f: impl FnOnce(&mut MemoryStore) -> R) -> Option<R> {
        match &self.backend {
            Backend::Memory(store) => Some(f(&mut *store.lock().expect("memory store lock"))),
            Backend::Sqlite(_) => None,
        }
    }
}

fn update_sqlite(
    conn: &mut Connection,
    id: DocumentId,
    expected_version: i64,
    content: &str,
    editor: &PrincipalId,
    now: DateTime<Utc>,
) -> Result<UpdateOutcome, StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin update transaction")?;

    if !documents::compare_and_swap(&tx, id, expected_version, content, now)? {
        // Dropping `tx` rolls back; nothing was written anyway.
        let current = documents::get(&tx, id)?.ok_or(StoreError::NotFound { id })?;
        return Ok(UpdateOutcome::Conflict { current, attempted_content: content.to_owned() });
    }

    let previous =
        revisions::latest_chain_hash(&tx, id)?.unwrap_or_else(|| audit::genesis_hash(id));
    let revision =
        audit::seal_revision(id, &previous, editor, expected_version + 1, content, now);
    revisions::append(&tx, &revision)?;

    let document =
        documents::get(&tx, id)?.context("document vanished inside its update transaction")?;
    tx.commit().context("failed to commit document update")?;
    Ok(UpdateOutcome::Accepted { document })
}

fn delete_sqlite(
    conn: &mut Connection,
    id: DocumentId,
    requestor: &PrincipalId,
) -> Result<u64, StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin delete transaction")?;

    let document = documents::get(&tx, id)?.ok_or(StoreError::NotFound { id })?;
    if &document.author_id != requestor {
        return Err(StoreError::Forbidden { id, requestor: requestor.clone() });
    }

    // Revisions reference the document, so they go first.
    let removed = revisions::delete_for_document(&tx, id)?;
    documents::delete(&tx, id)?;
    tx.commit().context("failed to commit document delete")?;
    Ok(removed)
}

fn history_sqlite(conn: &mut Connection, id: DocumentId) -> Result<Option<Vec<Revision>>, StoreError> {
    let tx = conn.transaction().context("failed to begin history read")?;
    if documents::get(&tx, id)?.is_none() {
        return Ok(None);
    }
    let history = revisions::list_for_document(&tx, id)?;
    tx.commit().context("failed to finish history read")?;
    Ok(Some(history))
}

fn require_text(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::Validation { field });
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Storage(anyhow!("document store lock poisoned")))
}

/// Current time at the precision the database keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error)))
}

pub(crate) fn decode_uuid(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error)))
}

//! Append-only revision history and its tamper-evident hash chain.
//!
//! Each revision stores
//! `chain_hash = sha256(prev || editor || version || updated_at || content)`
//! where `prev` is the hash of the revision one version earlier, or a
//! per-document genesis hash for the first one. Rewriting any stored revision,
//! its timestamp included, breaks every hash after it.
//!
//! The chain follows `version`, not the `updated_at` display order, so a wall
//! clock that stepped backwards between two edits does not look like tampering.

use chrono::{DateTime, Utc};
use inkwell_common::types::{DocumentId, PrincipalId, Revision};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{self, VersionedStore};

const GENESIS_DOMAIN: &[u8] = b"inkwell.revision.genesis";
const FIELD_SEPARATOR: &[u8] = &[0];

/// Read-only access to revision history. Obtained from `VersionedStore::audit`.
pub struct AuditLog<'a> {
    store: &'a VersionedStore,
}

/// Outcome of re-hashing one document's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub document_id: DocumentId,
    pub checked: usize,
    /// Version of the first revision whose stored hash does not match.
    pub first_broken_version: Option<i64>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.first_broken_version.is_none()
    }
}

impl<'a> AuditLog<'a> {
    pub(crate) fn new(store: &'a VersionedStore) -> Self {
        Self { store }
    }

    /// Accepted edits of a document, oldest first. Empty for a document that
    /// was never edited; `NotFound` for one that does not exist.
    pub fn history(&self, id: DocumentId) -> Result<Vec<Revision>, StoreError> {
        self.store.history(id)
    }

    pub fn verify(&self, id: DocumentId) -> Result<ChainReport, StoreError> {
        let history = self.store.history(id)?;
        let report = verify_chain(id, &history);
        if let Some(version) = report.first_broken_version {
            warn!(doc_id = %id, version, "revision chain broken");
        }
        Ok(report)
    }
}

fn verify_chain(id: DocumentId, history: &[Revision]) -> ChainReport {
    let mut chain: Vec<&Revision> = history.iter().collect();
    chain.sort_by_key(|revision| revision.version);

    let mut previous = genesis_hash(id);
    for revision in chain {
        let expected = chain_hash(
            &previous,
            &revision.editor_id,
            revision.version,
            revision.updated_at,
            &revision.content,
        );
        if expected != revision.chain_hash {
            return ChainReport {
                document_id: id,
                checked: history.len(),
                first_broken_version: Some(revision.version),
            };
        }
        previous = expected;
    }
    ChainReport { document_id: id, checked: history.len(), first_broken_version: None }
}

pub(crate) fn genesis_hash(id: DocumentId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(GENESIS_DOMAIN);
    hasher.update(FIELD_SEPARATOR);
    hasher.update(id.0.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the revision row for an accepted edit, linked to `previous`.
pub(crate) fn seal_revision(
    id: DocumentId,
    previous: &str,
    editor: &PrincipalId,
    version: i64,
    content: &str,
    updated_at: DateTime<Utc>,
) -> Revision {
    Revision {
        id: Uuid::new_v4(),
        document_id: id,
        content: content.to_owned(),
        editor_id: editor.clone(),
        version,
        updated_at,
        chain_hash: chain_hash(previous, editor, version, updated_at, content),
    }
}

fn chain_hash(
    previous: &str,
    editor: &PrincipalId,
    version: i64,
    updated_at: DateTime<Utc>,
    content: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(editor.as_str().as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(version.to_be_bytes());
    // Same text the database keeps, so a reloaded revision hashes identically.
    hasher.update(store::encode_timestamp(updated_at).as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, SubsecRound};

    use super::*;

    fn seeded_store() -> (VersionedStore, DocumentId) {
        let store = VersionedStore::in_memory();
        let doc = store.create("Hello", "World", &PrincipalId::new("alice")).unwrap();
        store.update(doc.id, 1, "two", &PrincipalId::new("bob")).unwrap();
        store.update(doc.id, 2, "three", &PrincipalId::new("alice")).unwrap();
        (store, doc.id)
    }

    #[test]
    fn genesis_hash_is_per_document() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_eq!(genesis_hash(a), genesis_hash(a));
        assert_ne!(genesis_hash(a), genesis_hash(b));
        assert_eq!(genesis_hash(a).len(), 64);
    }

    #[test]
    fn untouched_history_verifies() {
        let (store, id) = seeded_store();
        let report = store.audit().verify(id).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.checked, 2);
    }

    #[test]
    fn never_edited_document_verifies_empty() {
        let store = VersionedStore::in_memory();
        let doc = store.create("Hello", "World", &PrincipalId::new("alice")).unwrap();
        let report = store.audit().verify(doc.id).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.checked, 0);
    }

    #[test]
    fn rewritten_content_is_detected() {
        let (store, id) = seeded_store();
        store
            .with_memory(|memory| {
                let history = memory.revisions_mut(id).expect("history exists");
                history[0].content = "forged".into();
            })
            .expect("memory backend");

        let report = store.audit().verify(id).unwrap();
        assert_eq!(report.first_broken_version, Some(2));
    }

    #[test]
    fn rewritten_editor_breaks_later_link() {
        let (store, id) = seeded_store();
        store
            .with_memory(|memory| {
                let history = memory.revisions_mut(id).expect("history exists");
                history[1].editor_id = PrincipalId::new("mallory");
            })
            .expect("memory backend");

        let report = store.audit().verify(id).unwrap();
        assert_eq!(report.first_broken_version, Some(3));
    }

    #[test]
    fn clock_stepping_backwards_is_not_tampering() {
        let (store, id) = seeded_store();
        let later = Utc::now().trunc_subsecs(6);
        let earlier = later - Duration::seconds(1);

        // Re-seal both edits as if the clock went back between them.
        store
            .with_memory(|memory| {
                let history = memory.revisions_mut(id).expect("history exists");
                let second = seal_revision(
                    id,
                    &genesis_hash(id),
                    &history[0].editor_id,
                    2,
                    &history[0].content,
                    later,
                );
                let third = seal_revision(
                    id,
                    &second.chain_hash,
                    &history[1].editor_id,
                    3,
                    &history[1].content,
                    earlier,
                );
                *history = vec![second, third];
            })
            .expect("memory backend");

        let history = store.audit().history(id).unwrap();
        let versions: Vec<_> = history.iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![3, 2]);

        let report = store.audit().verify(id).unwrap();
        assert!(report.is_intact(), "{report:?}");
        assert_eq!(report.checked, 2);
    }

    #[test]
    fn rewritten_timestamp_is_detected() {
        let (store, id) = seeded_store();
        store
            .with_memory(|memory| {
                let history = memory.revisions_mut(id).expect("history exists");
                history[1].updated_at -= Duration::seconds(1);
            })
            .expect("memory backend");

        let report = store.audit().verify(id).unwrap();
        assert_eq!(report.first_broken_version, Some(3));
    }

    #[test]
    fn verify_unknown_document_is_not_found() {
        let store = VersionedStore::in_memory();
        let error = store.audit().verify(DocumentId::new()).unwrap_err();
        assert!(matches!(error, StoreError::NotFound { .. }));
    }
}

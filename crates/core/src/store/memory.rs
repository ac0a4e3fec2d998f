// In-memory backend with the same CAS semantics as the SQLite one.
//
// Every method runs under the store's single lock, so each call is one
// all-or-nothing step.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use inkwell_common::types::{Document, DocumentId, PrincipalId, Revision};

use crate::audit;

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    documents: HashMap<DocumentId, Document>,
    revisions: HashMap<DocumentId, Vec<Revision>>,
}

pub(crate) enum MemoryUpdate {
    Accepted(Document),
    Stale(Document),
    Missing,
}

pub(crate) enum MemoryDelete {
    Deleted { revisions_removed: u64 },
    NotAuthor,
    Missing,
}

impl MemoryStore {
    pub(crate) fn insert(&mut self, document: Document) {
        self.documents.insert(document.id, document);
    }

    pub(crate) fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents.get(&id).cloned()
    }

    pub(crate) fn list(&self) -> Vec<Document> {
        let mut items: Vec<Document> = self.documents.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    pub(crate) fn compare_and_swap(
        &mut self,
        id: DocumentId,
        expected_version: i64,
        content: &str,
        editor: &PrincipalId,
        now: DateTime<Utc>,
    ) -> MemoryUpdate {
        let Some(document) = self.documents.get_mut(&id) else {
            return MemoryUpdate::Missing;
        };
        if document.version != expected_version {
            return MemoryUpdate::Stale(document.clone());
        }

        let history = self.revisions.entry(id).or_default();
        let previous = history
            .last()
            .map(|revision| revision.chain_hash.clone())
            .unwrap_or_else(|| audit::genesis_hash(id));
        history.push(audit::seal_revision(
            id,
            &previous,
            editor,
            expected_version + 1,
            content,
            now,
        ));

        document.content = content.to_owned();
        document.version = expected_version + 1;
        document.updated_at = now;
        MemoryUpdate::Accepted(document.clone())
    }

    pub(crate) fn delete(&mut self, id: DocumentId, requestor: &PrincipalId) -> MemoryDelete {
        match self.documents.get(&id) {
            None => return MemoryDelete::Missing,
            Some(document) if &document.author_id != requestor => return MemoryDelete::NotAuthor,
            Some(_) => {}
        }

        let revisions_removed =
            self.revisions.remove(&id).map(|history| history.len() as u64).unwrap_or(0);
        self.documents.remove(&id);
        MemoryDelete::Deleted { revisions_removed }
    }

    /// `None` when the document does not exist.
    pub(crate) fn history(&self, id: DocumentId) -> Option<Vec<Revision>> {
        if !self.documents.contains_key(&id) {
            return None;
        }
        let mut history = self.revisions.get(&id).cloned().unwrap_or_default();
        history.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.version.cmp(&b.version)));
        Some(history)
    }

    #[cfg(test)]
    pub(crate) fn revisions_mut(&mut self, id: DocumentId) -> Option<&mut Vec<Revision>> {
        self.revisions.get_mut(&id)
    }
}

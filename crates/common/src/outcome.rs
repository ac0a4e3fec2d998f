// Structured results of store operations that are not plain errors.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::types::{Document, DocumentId};

/// Result of a version-checked update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The expected version matched; the edit was applied.
    Accepted { document: Document },
    /// Someone else's edit landed first. Nothing was written.
    ///
    /// `attempted_content` is the caller's draft, returned verbatim so it can
    /// be redisplayed next to `current`.
    Conflict { current: Document, attempted_content: String },
}

impl UpdateOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The document as it stands after the call.
    pub fn document(&self) -> &Document {
        match self {
            Self::Accepted { document } => document,
            Self::Conflict { current, .. } => current,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Accepted { .. } => None,
            Self::Conflict { .. } => Some(ErrorCode::EditConflict),
        }
    }
}

/// Confirmation of a cascading delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteReceipt {
    pub id: DocumentId,
    pub revisions_removed: u64,
}

use inkwell_common::error::ErrorCode;
use inkwell_common::task::PoolKind;
use inkwell_common::types::{DocumentId, PrincipalId};

/// Failures of `VersionedStore` and `AuditLog` calls.
///
/// A stale version is not an error: it comes back as
/// `UpdateOutcome::Conflict` so the caller keeps its draft.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{field} must not be empty")]
    Validation { field: &'static str },
    #[error("document {id} not found")]
    NotFound { id: DocumentId },
    #[error("{requestor} is not the author of document {id}")]
    Forbidden { id: DocumentId, requestor: PrincipalId },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::Storage(_) => ErrorCode::InternalError,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.into())
    }
}

/// Rejections of `TaskDispatcher::submit`. Once accepted, a task's own
/// failure is never reported back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("{pool} queue is full ({capacity} tasks waiting)")]
    ResourceExhausted { pool: PoolKind, capacity: usize },
    #[error("{pool} pool is no longer accepting tasks")]
    Closed { pool: PoolKind },
}

impl SubmitError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ResourceExhausted { .. } => ErrorCode::ResourceExhausted,
            Self::Closed { .. } => ErrorCode::InternalError,
        }
    }
}

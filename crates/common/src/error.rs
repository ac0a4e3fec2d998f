// Stable error code registry shared by the store, the dispatcher and any
// presentation layer rendering their results.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    NotFound,
    Forbidden,
    EditConflict,
    ResourceExhausted,
    InternalError,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::EditConflict => "EDIT_CONFLICT",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether repeating the identical call could succeed later.
    ///
    /// `EditConflict` is not retryable: the caller has to make a fresh edit
    /// decision against the current version.
    pub const fn retryable(self) -> bool {
        matches!(self, Self::ResourceExhausted | Self::InternalError)
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ValidationFailed => "request validation failed",
            Self::NotFound => "document not found",
            Self::Forbidden => "only the document author may do this",
            Self::EditConflict => "document changed since it was read",
            Self::ResourceExhausted => "background queue is full",
            Self::InternalError => "internal error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

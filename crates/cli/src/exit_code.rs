// Consistent exit codes for the inkwell CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/validation error
//   10 = document not found
//   11 = not allowed (only the author may delete)
//   12 = edit conflict (stale version)
//   13 = background queue full

use std::process;

use inkwell_common::error::ErrorCode;
use inkwell_core::config::ConfigError;
use inkwell_core::error::{StoreError, SubmitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotFound = 10,
    Forbidden = 11,
    Conflict = 12,
    Exhausted = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        error_code(err).map(Self::from_error_code).unwrap_or(Self::Error)
    }

    pub fn from_error_code(code: ErrorCode) -> Self {
        match code {
            ErrorCode::ValidationFailed => Self::Usage,
            ErrorCode::NotFound => Self::NotFound,
            ErrorCode::Forbidden => Self::Forbidden,
            ErrorCode::EditConflict => Self::Conflict,
            ErrorCode::ResourceExhausted => Self::Exhausted,
            ErrorCode::InternalError => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// First registry code found in the error chain.
pub fn error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            return Some(store.code());
        }
        if let Some(submit) = cause.downcast_ref::<SubmitError>() {
            return Some(submit.code());
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return Some(ErrorCode::ValidationFailed);
        }
        None
    })
}

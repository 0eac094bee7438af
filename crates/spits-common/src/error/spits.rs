//! Coordinator error types.
//!
//! Every failure a coordinator can observe is a [`SpitsError`]. The
//! taxonomy splits into two halves: recoverable errors, which the
//! coordinator turns into a failed result value, and fatal faults, which
//! escape the coordinator boundary as `Err`.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid identifier provided.
    InvalidIdentifier = 0x0003,
    /// Invalid configuration.
    InvalidConfig = 0x0004,

    // Catalog errors (0x0100 - 0x01FF)
    /// Table is already staged for creation in this session.
    TableStaged = 0x0100,
    /// Table already exists in the permanent catalog.
    TableExists = 0x0101,
    /// Table is staged for deletion in this session.
    TableSoftDeleted = 0x0102,
    /// Table does not logically exist.
    TableNotFound = 0x0103,

    // Backend errors (0x0200 - 0x02FF)
    /// Statement failed in the backend.
    BackendFailure = 0x0200,
    /// Commit applied only part of the staged changes.
    PartialCommit = 0x0201,

    // Contract faults (0x0300 - 0x03FF)
    /// Query kind that can never be staged.
    Disallowed = 0x0300,
    /// Query of the wrong kind passed to an action.
    WrongQueryKind = 0x0301,

    // Consistency faults (0x0400 - 0x04FF)
    /// Staging sets and backend catalog have diverged.
    InconsistentState = 0x0400,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Catalog",
            0x02 => "Backend",
            0x03 => "Contract",
            0x04 => "Consistency",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for SPITS.
///
/// # Example
///
/// ```rust
/// use spits_common::error::{SpitsError, SpitsResult};
///
/// fn drop_missing(table: &str) -> SpitsResult<()> {
///     Err(SpitsError::NotLogicallyPresent { table: table.to_string() })
/// }
///
/// let err = drop_missing("users").unwrap_err();
/// assert!(!err.is_fatal());
/// ```
#[derive(Debug, Clone, Error)]
pub enum SpitsError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// A table name failed identifier validation.
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Catalog Errors
    // ==========================================================================
    /// Table is already staged for creation in this session.
    #[error("table '{table}' already logically exists (staged for creation)")]
    TableStaged {
        /// The staged table.
        table: String,
    },

    /// Table already exists in the permanent catalog.
    #[error("table '{table}' already exists")]
    TableExists {
        /// The existing table.
        table: String,
    },

    /// Table is staged for deletion and hidden from this session.
    #[error("table '{table}' does not exist (soft-deleted)")]
    TableSoftDeleted {
        /// The soft-deleted table.
        table: String,
    },

    /// Drop of a table that is absent or already soft-deleted.
    #[error("attempting to delete table '{table}' that doesn't logically exist")]
    NotLogicallyPresent {
        /// The missing table.
        table: String,
    },

    // ==========================================================================
    // Backend Errors
    // ==========================================================================
    /// Statement failed in the backend.
    #[error("backend error: {message}")]
    Backend {
        /// Error message reported by the backend.
        message: String,
    },

    /// Commit applied only part of the staged changes.
    ///
    /// Staging state has already been cleared when this is reported.
    #[error("commit partially applied, first failure on '{table}': {message}")]
    PartialCommit {
        /// The table whose promotion or drop failed first.
        table: String,
        /// The first error encountered.
        message: String,
    },

    // ==========================================================================
    // Contract Faults
    // ==========================================================================
    /// Query kind that is never accepted.
    #[error("disallowed query {kind}: incompatible with staged schema changes")]
    Disallowed {
        /// The rejected query kind.
        kind: String,
    },

    /// Query of the wrong kind passed to an action.
    #[error("wrong query kind: expected {expected}, got {actual}")]
    WrongQueryKind {
        /// The kind the action handles.
        expected: String,
        /// The kind it was given.
        actual: String,
    },

    // ==========================================================================
    // Consistency Faults
    // ==========================================================================
    /// Staging sets disagree with the backend catalog.
    #[error(
        "table '{table}' is in an inconsistent state: permanent={permanent}, \
         staged_create={staged_create}, staged_delete={staged_delete}"
    )]
    InconsistentState {
        /// The affected table.
        table: String,
        /// Whether the backend catalog holds a permanent table.
        permanent: bool,
        /// Whether the table is staged for creation.
        staged_create: bool,
        /// Whether the table is staged for deletion.
        staged_delete: bool,
    },
}

impl SpitsError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::TableStaged { .. } => ErrorCode::TableStaged,
            Self::TableExists { .. } => ErrorCode::TableExists,
            Self::TableSoftDeleted { .. } => ErrorCode::TableSoftDeleted,
            Self::NotLogicallyPresent { .. } => ErrorCode::TableNotFound,
            Self::Backend { .. } => ErrorCode::BackendFailure,
            Self::PartialCommit { .. } => ErrorCode::PartialCommit,
            Self::Disallowed { .. } => ErrorCode::Disallowed,
            Self::WrongQueryKind { .. } => ErrorCode::WrongQueryKind,
            Self::InconsistentState { .. } => ErrorCode::InconsistentState,
        }
    }

    /// Returns true if this error must escape the coordinator as a fault
    /// instead of being folded into a failed result.
    ///
    /// Caller-contract violations and internal-consistency breaks are fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Disallowed { .. }
                | Self::WrongQueryKind { .. }
                | Self::InconsistentState { .. }
                | Self::Internal { .. }
        )
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

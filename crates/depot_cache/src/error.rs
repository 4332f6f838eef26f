//! Error types for cache operations.

use std::fmt;
use std::path::PathBuf;

/// Message used when corruption is reported without a specific reason.
pub const CORRUPTED_MESSAGE: &str =
    "Compiler dependency information on disk is corrupted. Rebuild required.";

/// The four record families held in the record pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Class metadata keyed by [`ClassInfoId`](crate::ClassInfoId).
    ClassInfo,
    /// Member lists and class referencers keyed by [`DeclarationId`](crate::DeclarationId).
    Declaration,
    /// A field declaration keyed by [`FieldId`](crate::FieldId).
    Field,
    /// A method declaration keyed by [`MethodId`](crate::MethodId).
    Method,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::ClassInfo => "class info",
            RecordKind::Declaration => "class declaration",
            RecordKind::Field => "field declaration",
            RecordKind::Method => "method declaration",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during cache operations.
///
/// There is no partial repair: every variant except
/// [`InvariantViolation`](CacheError::InvariantViolation) means the store can
/// no longer be trusted and the caller should [`wipe`](crate::Cache::wipe) it
/// and rebuild everything.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing store files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An id handed to the cache does not resolve to a live record.
    #[error("{kind} record {id} not found")]
    RecordNotFound {
        /// Which record family was consulted.
        kind: RecordKind,
        /// The raw id.
        id: u32,
    },

    /// The caller broke an API contract. This is a bug, not disk corruption.
    #[error("cache invariant violated: {0}")]
    InvariantViolation(String),

    /// Stored data is inconsistent or unreadable.
    #[error("{}", .reason.as_deref().unwrap_or(CORRUPTED_MESSAGE))]
    Corrupted {
        /// Specific description, if one is known.
        reason: Option<String>,
    },

    /// A record could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    /// Corruption with a specific reason.
    pub fn corrupted_because(reason: impl Into<String>) -> Self {
        CacheError::Corrupted {
            reason: Some(reason.into()),
        }
    }

    /// Returns `true` if the right response is a wipe and full rebuild, and
    /// `false` for programming errors.
    pub fn requires_rebuild(&self) -> bool {
        !matches!(self, CacheError::InvariantViolation(_))
    }
}

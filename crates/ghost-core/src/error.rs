//! Error types for the Ghost scoped filesystem.
//!
//! This module provides the error hierarchy shared by the storage drivers,
//! the content cache, the scoped filesystem façade and the invalidation
//! layer. Every variant carries enough context (operation, logical path) to
//! be actionable without a stack trace.
//!
//! # Examples
//!
//! ```
//! use ghost_core::{Error, Result};
//!
//! fn check_scope(id: &str) -> Result<()> {
//!     if id.is_empty() {
//!         return Err(Error::InvalidScope {
//!             scope: id.to_string(),
//!             reason: "scope id cannot be empty".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = check_scope("").unwrap_err();
//! assert!(err.is_validation());
//! ```

use thiserror::Error;

/// Main error type for Ghost filesystem operations.
///
/// All crates in the workspace use this type, providing consistent error
/// handling from the byte-level drivers up to the scoped façade.
#[derive(Error, Debug)]
pub enum Error {
    /// Scope identifier failed validation.
    ///
    /// Raised before any filesystem object is constructed for the scope;
    /// invalid ids never reach a storage driver.
    #[error("Invalid scope '{scope}': {reason}")]
    InvalidScope {
        /// The offending scope identifier
        scope: String,
        /// Why the identifier was rejected
        reason: String,
    },

    /// Content mutation attempted on an enumeration-only scope.
    ///
    /// Scopes whose base prefix ends in a wildcard support directory
    /// enumeration but no file content operations.
    #[error("Scope '{scope}' is enumeration-only, file content operations are disabled")]
    ReadOnlyScope {
        /// The enumeration-only scope prefix
        scope: String,
    },

    /// Scope prefix contains a wildcard anywhere but at the very end.
    #[error("Invalid scope prefix '{prefix}': wildcard is only allowed as the last segment")]
    WildcardPrefix {
        /// The malformed prefix
        prefix: String,
    },

    /// File content exceeds the size ceiling for its extension.
    ///
    /// The write is rejected before any driver call, so no partial state is
    /// ever observable.
    #[error("File '{path}' is too large: {size_bytes} bytes (limit {limit_bytes})")]
    FileTooLarge {
        /// Logical path of the rejected file
        path: String,
        /// Size of the rejected content in bytes
        size_bytes: u64,
        /// The configured ceiling in bytes
        limit_bytes: u64,
    },

    /// File not found at the given logical path.
    ///
    /// Distinguished from [`Error::Io`] so callers can treat "absent" as a
    /// normal outcome rather than an exceptional one.
    #[error("File not found: {path}")]
    NotFound {
        /// The logical path that was not found
        path: String,
    },

    /// Path is invalid or escapes its scope.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// I/O failure in the underlying storage medium.
    ///
    /// Wraps the medium's error with the operation and the logical path it
    /// was performed on. Propagated, never silently swallowed, except inside
    /// directory listings where "nothing there" degrades to an empty result.
    #[error("IO error during {operation} on '{path}': {source}")]
    Io {
        /// The driver operation that failed (e.g. `write`, `move`)
        operation: &'static str,
        /// Logical path the operation targeted
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Structured content could not be parsed at all.
    #[error("Could not parse file '{path}': {reason}")]
    Parse {
        /// The offending file
        path: String,
        /// Underlying parser message
        reason: String,
    },

    /// Content parsed as structured data but did not match the requested type.
    #[error("File '{path}' has unexpected shape: {reason}")]
    TypeMismatch {
        /// The offending file
        path: String,
        /// Underlying conversion message
        reason: String,
    },

    /// Archive packaging or unpackaging failed.
    #[error("Archive error: {reason}")]
    Archive {
        /// Description of the archive failure
        reason: String,
    },
}

impl Error {
    /// Builds an [`Error::Io`] with operation and logical path context.
    ///
    /// # Examples
    ///
    /// ```
    /// use ghost_core::Error;
    /// use std::io;
    ///
    /// let err = Error::io("write", "flows/main.flow.json",
    ///     io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
    /// assert!(err.is_io());
    /// ```
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this is a not-found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ghost_core::Error;
    ///
    /// let err = Error::NotFound { path: "missing.json".to_string() };
    /// assert!(err.is_not_found());
    /// ```
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a local validation error.
    ///
    /// Validation errors (bad scope id, oversize file, write to an
    /// enumeration-only scope, bad path) are never retried and always
    /// surfaced to the immediate caller.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidScope { .. }
                | Self::ReadOnlyScope { .. }
                | Self::WildcardPrefix { .. }
                | Self::FileTooLarge { .. }
                | Self::InvalidPath { .. }
        )
    }

    /// Returns `true` if this error wraps a storage medium failure.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns `true` if this is a parse or type-mismatch error.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::TypeMismatch { .. })
    }
}

/// Result type alias for Ghost operations.
pub type Result<T> = std::result::Result<T, Error>;

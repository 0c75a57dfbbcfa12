//! Storage driver trait.
//!
//! The driver is the one pluggable seam in the subsystem: a narrow,
//! byte-oriented, scope-agnostic interface against a concrete medium. It
//! only ever sees absolute-resolved logical paths; scoping, caching and
//! path sanitation all live above it.

use crate::error::Result;
use crate::types::Revision;
use async_trait::async_trait;

/// Sort order for directory listings, by last-modified timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    ModifiedAsc,
    /// Newest first.
    ModifiedDesc,
}

/// Options for [`StorageDriver::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Glob patterns excluded from the listing, combined with the
    /// deployment's ghost-ignore file.
    pub exclude_patterns: Vec<String>,
    /// Include dot-files in the listing.
    pub include_hidden: bool,
    /// Optional sort by last-modified timestamp.
    pub sort: Option<SortOrder>,
}

/// Byte-level file operations against a concrete storage medium.
///
/// One implementation (disk-backed) ships in this workspace; alternate
/// media (e.g. database-backed) implement the same interface.
///
/// # Contract
///
/// - `write` creates parent directories as needed and overwrites atomically
///   from the caller's point of view.
/// - `file_size` on a missing path is an I/O error, not a not-found error;
///   callers that need existence semantics call `exists` first.
/// - `list` returns an empty list (not an error) when the directory does
///   not exist, and deliberately degrades every other listing failure to an
///   empty result to keep higher layers simple.
/// - Revision recording is best-effort; the default implementations are
///   no-ops and a driver without history support is a valid driver.
///
/// # Examples
///
/// ```no_run
/// use ghost_core::{ListOptions, StorageDriver};
///
/// async fn dump(driver: &dyn StorageDriver) -> ghost_core::Result<()> {
///     for path in driver.list("bots/bot-7", &ListOptions::default()).await? {
///         let content = driver.read(&path).await?;
///         println!("{path}: {} bytes", content.len());
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Writes `content` to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the medium rejects the write; no partial
    /// state is observable afterwards.
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Reads the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an absent path, an I/O error otherwise.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Returns `true` if a file exists at `path`.
    async fn exists(&self, path: &str) -> bool;

    /// Returns the size of `path` in bytes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for a missing path; callers that need existence
    /// semantics call [`exists`](Self::exists) first.
    async fn file_size(&self, path: &str) -> Result<u64>;

    /// Deletes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when deletion fails. Callers treat deleting a
    /// non-existent file as success by pre-checking `exists`.
    async fn delete_file(&self, path: &str) -> Result<()>;

    /// Moves a file from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the move fails.
    async fn move_file(&self, from: &str, to: &str) -> Result<()>;

    /// Recursively deletes the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when deletion fails.
    async fn delete_dir(&self, path: &str) -> Result<()>;

    /// Lists file paths under `dir`, relative to `dir`.
    ///
    /// Returns `[]` when `dir` does not exist. Combines `options`' exclude
    /// globs with the deployment's ghost-ignore file before matching.
    ///
    /// # Errors
    ///
    /// Implementations degrade listing failures to `Ok(vec![])`; the
    /// `Result` remains for drivers whose option parsing can fail.
    async fn list(&self, dir: &str, options: &ListOptions) -> Result<Vec<String>>;

    /// Records a revision for `path`. Best-effort; default is a no-op.
    ///
    /// # Errors
    ///
    /// Implementations may surface I/O errors; callers treat history as
    /// best-effort and never as the source of truth for content.
    async fn record_revision(&self, _path: &str, _author: &str) -> Result<()> {
        Ok(())
    }

    /// Lists recorded revisions under a path prefix. Default is empty.
    ///
    /// # Errors
    ///
    /// Implementations may surface I/O errors; the default never does.
    async fn list_revisions(&self, _prefix: &str) -> Result<Vec<Revision>> {
        Ok(Vec::new())
    }

    /// Flushes `path` to a secondary durable store, for deployments that
    /// keep a mirror (e.g. a database copy) in sync with the medium.
    /// Default is a no-op.
    ///
    /// # Errors
    ///
    /// Implementations may surface I/O errors; the default never does.
    async fn flush_to_mirror(&self, _path: &str) -> Result<()> {
        Ok(())
    }
}

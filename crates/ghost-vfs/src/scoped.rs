//! The per-tenant scoped filesystem.
//!
//! `ScopedGhost` is the façade every feature service sees: path
//! normalization, size enforcement, cache-first reads, write-through
//! mutation with synchronous change events, and glob-filtered listings.
//! Byte I/O is delegated to the storage driver; the content cache is owned
//! exclusively by the instance.

use crate::path::normalize_path;
use ghost_cache::MemoryContentCache;
use ghost_core::{
    CacheKey, Error, FileKind, GhostConfig, ListOptions, Result, Revision, ScopeId, SizeLimits,
    SortOrder, StorageDriver,
};
use globset::GlobBuilder;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the change-event broadcast channel.
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Options for [`ScopedGhost::upsert_file`].
#[derive(Debug, Clone, Default)]
pub struct UpsertOptions {
    /// Record a best-effort revision for the write.
    pub record_revision: bool,
    /// Revision author; defaults to `system` when recording.
    pub author: Option<String>,
    /// Synchronously flush the written file to the deployment's durable
    /// mirror (e.g. a database copy kept in sync with disk).
    pub flush_to_mirror: bool,
}

/// Options for [`ScopedGhost::directory_listing`].
#[derive(Debug, Clone)]
pub struct DirectoryListingOptions {
    /// Glob name-pattern applied as a second, independent filter stage.
    ///
    /// Case-insensitive; matches the base name unless the pattern itself
    /// spans directory separators.
    pub name_pattern: String,
    /// Exclude globs forwarded to the driver enumeration.
    pub exclude_patterns: Vec<String>,
    /// Include dot-files.
    pub include_hidden: bool,
    /// Optional sort by last-modified timestamp.
    pub sort: Option<SortOrder>,
}

impl Default for DirectoryListingOptions {
    fn default() -> Self {
        Self {
            name_pattern: "*".to_string(),
            exclude_patterns: Vec::new(),
            include_hidden: false,
            sort: None,
        }
    }
}

/// A tenant-scoped, cached view over a storage driver.
///
/// Instances are handed out by [`GhostRegistry`](crate::GhostRegistry);
/// every part of a process shares one instance (one cache, one listener
/// set) per scope.
///
/// # Examples
///
/// ```no_run
/// use ghost_core::GhostConfig;
/// use ghost_storage::DiskDriver;
/// use ghost_vfs::{ScopedGhost, UpsertOptions};
/// use std::sync::Arc;
///
/// # async fn example() -> ghost_core::Result<()> {
/// let driver = Arc::new(DiskDriver::new("./storage").await?);
/// let ghost = ScopedGhost::new("bots/bot-7", driver, &GhostConfig::default())?;
///
/// ghost
///     .upsert_file("flows", "main.flow.json", b"{\"nodes\":[]}", &UpsertOptions::default())
///     .await?;
/// assert!(ghost.file_exists("flows", "main.flow.json").await?);
/// # Ok(())
/// # }
/// ```
pub struct ScopedGhost {
    scope: Option<ScopeId>,
    prefix: String,
    root: String,
    enumeration_only: bool,
    sanitize: bool,
    limits: SizeLimits,
    driver: Arc<dyn StorageDriver>,
    cache: MemoryContentCache,
    events: broadcast::Sender<String>,
}

impl std::fmt::Debug for ScopedGhost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedGhost")
            .field("prefix", &self.prefix)
            .field("enumeration_only", &self.enumeration_only)
            .field("cached_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ScopedGhost {
    /// Creates a scoped filesystem rooted at `prefix`.
    ///
    /// A prefix whose final segment is a single `*` marks the scope
    /// enumeration-only: listings work, file content operations fail with
    /// [`Error::ReadOnlyScope`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::WildcardPrefix`] when a wildcard appears anywhere
    /// but as the entire final segment.
    pub fn new(
        prefix: impl Into<String>,
        driver: Arc<dyn StorageDriver>,
        config: &GhostConfig,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self::with_events(None, prefix, driver, config, events)
    }

    /// Creates the filesystem for a validated scope.
    ///
    /// # Errors
    ///
    /// Propagates prefix validation failures; scope base prefixes never
    /// carry wildcards, so this only fails on driver-independent invariants.
    pub fn for_scope(
        scope: &ScopeId,
        driver: Arc<dyn StorageDriver>,
        config: &GhostConfig,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self::with_events(Some(scope.clone()), scope.base_prefix(), driver, config, events)
    }

    /// Shared constructor; the registry passes one event channel to every
    /// scope so a single subscription observes all changes in the process.
    pub(crate) fn with_events(
        scope: Option<ScopeId>,
        prefix: impl Into<String>,
        driver: Arc<dyn StorageDriver>,
        config: &GhostConfig,
        events: broadcast::Sender<String>,
    ) -> Result<Self> {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/').to_string();

        let (root, enumeration_only) = match trimmed.find('*') {
            None => (trimmed.clone(), false),
            Some(pos) => {
                let is_final_segment =
                    pos == trimmed.len() - 1 && (trimmed == "*" || trimmed.ends_with("/*"));
                if !is_final_segment {
                    return Err(Error::WildcardPrefix { prefix: trimmed });
                }
                let root = trimmed.trim_end_matches('*').trim_matches('/').to_string();
                (root, true)
            }
        };

        Ok(Self {
            scope,
            prefix: trimmed,
            root,
            enumeration_only,
            sanitize: config.sanitize_filenames,
            limits: config.limits.clone(),
            driver,
            cache: MemoryContentCache::new(),
            events,
        })
    }

    /// Returns the scope this filesystem was built for, when built through
    /// the registry.
    #[must_use]
    pub const fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    /// Normalizes `parts` against this scope's root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for traversal or empty resolutions.
    pub fn resolve(&self, parts: &[&str]) -> Result<String> {
        normalize_path(&self.root, parts, self.sanitize)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.enumeration_only {
            return Err(Error::ReadOnlyScope {
                scope: self.prefix.clone(),
            });
        }
        Ok(())
    }

    fn emit_changed(&self, path: &str) {
        tracing::debug!(path, "file changed");
        let _ = self.events.send(path.to_string());
    }

    /// Creates or replaces a file.
    ///
    /// Content larger than the per-extension ceiling is rejected before any
    /// driver call, so no partial write is ever observable. On success the
    /// cache is write-through updated and a change event is emitted before
    /// this call returns.
    ///
    /// # Errors
    ///
    /// [`Error::ReadOnlyScope`], [`Error::FileTooLarge`], path validation
    /// errors, or the driver's I/O error.
    pub async fn upsert_file(
        &self,
        dir: &str,
        name: &str,
        content: impl AsRef<[u8]>,
        options: &UpsertOptions,
    ) -> Result<()> {
        self.ensure_writable()?;
        let path = self.resolve(&[dir, name])?;
        let content = content.as_ref();

        let limit = self.limits.limit_for(&path);
        let size = content.len() as u64;
        if size > limit {
            return Err(Error::FileTooLarge {
                path,
                size_bytes: size,
                limit_bytes: limit,
            });
        }

        self.driver.write(&path, content).await?;
        if options.record_revision {
            let author = options.author.as_deref().unwrap_or("system");
            self.driver.record_revision(&path, author).await?;
        }
        if options.flush_to_mirror {
            self.driver.flush_to_mirror(&path).await?;
        }

        // Both kinds drop, then the buffer kind is written through, so a
        // read issued after this call returns observes the new content.
        self.cache.invalidate_path(&path);
        self.cache.set_buffer(&path, content.to_vec());
        self.emit_changed(&path);
        Ok(())
    }

    /// Typed upsert routed through a [`FileKind`] descriptor.
    ///
    /// Runs the kind's scope rule and content validator, then writes under
    /// the kind's base directory.
    ///
    /// # Errors
    ///
    /// The descriptor's validation errors, plus everything
    /// [`upsert_file`](Self::upsert_file) returns. Fails with
    /// [`Error::InvalidScope`] on a filesystem not built through the
    /// registry (no scope to check the kind against).
    pub async fn upsert_kind(
        &self,
        kind: FileKind,
        name: &str,
        content: impl AsRef<[u8]>,
        options: &UpsertOptions,
    ) -> Result<()> {
        let Some(scope) = &self.scope else {
            return Err(Error::InvalidScope {
                scope: self.prefix.clone(),
                reason: "kind-routed writes require a scope-bound filesystem".to_string(),
            });
        };
        let content = content.as_ref();
        kind.check(scope, name, content)?;
        self.upsert_file(kind.descriptor().base_dir, name, content, options)
            .await
    }

    /// Reads a file's raw bytes, cache-first.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an absent file, [`Error::ReadOnlyScope`] on
    /// an enumeration-only scope, or the driver's I/O error.
    pub async fn read_file_as_buffer(&self, dir: &str, name: &str) -> Result<Arc<Vec<u8>>> {
        self.ensure_writable()?;
        let path = self.resolve(&[dir, name])?;
        self.read_buffer_at(&path).await
    }

    async fn read_buffer_at(&self, path: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(content) = self.cache.get_buffer(path) {
            return Ok(content);
        }
        let content = self.driver.read(path).await?;
        Ok(self.cache.set_buffer(path, content))
    }

    /// Reads a file as UTF-8 text, cache-first.
    ///
    /// # Errors
    ///
    /// Everything [`read_file_as_buffer`](Self::read_file_as_buffer)
    /// returns, plus [`Error::Parse`] for invalid UTF-8.
    pub async fn read_file_as_string(&self, dir: &str, name: &str) -> Result<String> {
        self.ensure_writable()?;
        let path = self.resolve(&[dir, name])?;
        let content = self.read_buffer_at(&path).await?;
        String::from_utf8(content.as_ref().clone()).map_err(|e| Error::Parse {
            path,
            reason: format!("file is not valid UTF-8: {e}"),
        })
    }

    /// Reads and parses a file as JSON, cache-first.
    ///
    /// The parsed value is cached independently of the raw bytes, so
    /// repeated object reads never re-parse. Malformed JSON surfaces as
    /// [`Error::Parse`]; well-formed JSON that does not match `T` surfaces
    /// as [`Error::TypeMismatch`] — both name the offending file.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`], [`Error::Parse`], [`Error::TypeMismatch`], or
    /// the driver's I/O error.
    pub async fn read_file_as_object<T: DeserializeOwned>(
        &self,
        dir: &str,
        name: &str,
    ) -> Result<T> {
        self.ensure_writable()?;
        let path = self.resolve(&[dir, name])?;

        let value = if let Some(value) = self.cache.get_object(&path) {
            value
        } else {
            let content = self.read_buffer_at(&path).await?;
            let parsed: serde_json::Value =
                serde_json::from_slice(&content).map_err(|e| Error::Parse {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            self.cache.set_object(&path, parsed)
        };

        serde_json::from_value(value.as_ref().clone()).map_err(|e| Error::TypeMismatch {
            path,
            reason: e.to_string(),
        })
    }

    /// Returns `true` if the file exists.
    ///
    /// A cached entry of either kind counts as proof of existence without
    /// touching the driver.
    ///
    /// # Errors
    ///
    /// [`Error::ReadOnlyScope`] or path validation errors.
    pub async fn file_exists(&self, dir: &str, name: &str) -> Result<bool> {
        self.ensure_writable()?;
        let path = self.resolve(&[dir, name])?;
        if self.cache.has_any(&path) {
            return Ok(true);
        }
        Ok(self.driver.exists(&path).await)
    }

    /// Deletes a file, invalidating its cache entries.
    ///
    /// # Errors
    ///
    /// [`Error::ReadOnlyScope`], path validation errors, or the driver's
    /// I/O error (deleting an absent file is an I/O error; callers that
    /// treat it as success pre-check [`file_exists`](Self::file_exists)).
    pub async fn delete_file(&self, dir: &str, name: &str) -> Result<()> {
        self.ensure_writable()?;
        let path = self.resolve(&[dir, name])?;
        self.driver.delete_file(&path).await?;
        self.cache.invalidate_path(&path);
        self.emit_changed(&path);
        Ok(())
    }

    /// Renames a file within the scope.
    ///
    /// # Errors
    ///
    /// [`Error::ReadOnlyScope`], path validation errors, or the driver's
    /// I/O error.
    pub async fn rename_file(&self, dir: &str, from: &str, to: &str) -> Result<()> {
        self.ensure_writable()?;
        let source = self.resolve(&[dir, from])?;
        let target = self.resolve(&[dir, to])?;
        self.driver.move_file(&source, &target).await?;
        self.cache.invalidate_path(&source);
        self.cache.invalidate_path(&target);
        self.emit_changed(&source);
        self.emit_changed(&target);
        Ok(())
    }

    /// Recursively deletes a directory, invalidating every affected entry.
    ///
    /// # Errors
    ///
    /// [`Error::ReadOnlyScope`], path validation errors, or the driver's
    /// I/O error.
    pub async fn delete_folder(&self, dir: &str) -> Result<()> {
        self.ensure_writable()?;
        let path = self.resolve(&[dir])?;
        self.driver.delete_dir(&path).await?;
        self.cache.invalidate_prefix(&format!("{path}/"));
        self.cache.invalidate_path(&path);
        self.emit_changed(&path);
        Ok(())
    }

    /// Lists files under `dir`, relative to `dir`.
    ///
    /// Enumeration is delegated to the driver (which applies excludes and
    /// the ghost-ignore file); the name-pattern then runs as a second,
    /// independent filter stage. Returns `[]` rather than an error when
    /// there is nothing there.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPath`] for a malformed name-pattern.
    pub async fn directory_listing(
        &self,
        dir: &str,
        options: &DirectoryListingOptions,
    ) -> Result<Vec<String>> {
        let abs_dir = if dir.trim_matches('/').is_empty() {
            self.root.clone()
        } else {
            self.resolve(&[dir])?
        };

        let glob = GlobBuilder::new(&options.name_pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::InvalidPath {
                path: options.name_pattern.clone(),
                reason: format!("invalid name pattern: {e}"),
            })?;
        let matcher = glob.compile_matcher();
        let pattern_spans_dirs = options.name_pattern.contains('/');

        let listed = self
            .driver
            .list(
                &abs_dir,
                &ListOptions {
                    exclude_patterns: options.exclude_patterns.clone(),
                    include_hidden: options.include_hidden,
                    sort: options.sort,
                },
            )
            .await?;

        Ok(listed
            .into_iter()
            .filter(|relative| {
                if pattern_spans_dirs {
                    matcher.is_match(relative)
                } else {
                    let base = relative.rsplit('/').next().unwrap_or(relative);
                    matcher.is_match(base)
                }
            })
            .collect())
    }

    /// Lists best-effort revision records under a directory prefix.
    ///
    /// # Errors
    ///
    /// Path validation errors or the driver's I/O error; drivers without
    /// history support return an empty list.
    pub async fn list_revisions(&self, dir: &str) -> Result<Vec<Revision>> {
        let prefix = if dir.trim_matches('/').is_empty() {
            self.root.clone()
        } else {
            self.resolve(&[dir])?
        };
        self.driver.list_revisions(&prefix).await
    }

    /// Subscribes to change events for this process.
    ///
    /// Events carry the normalized path and are emitted synchronously
    /// after every successful mutation, before the mutating call returns.
    /// Consumers that need the new content re-read through the façade.
    #[must_use]
    pub fn on_file_changed(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Subscribes to this scope's cache invalidation stream.
    #[must_use]
    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<CacheKey> {
        self.cache.subscribe()
    }

    /// Drops one cache entry, as directed by the invalidation layer.
    pub fn invalidate_cached(&self, key: &CacheKey) {
        self.cache.invalidate(key);
    }

    /// Drops both cache kinds for `path`.
    pub fn invalidate_cached_path(&self, path: &str) {
        self.cache.invalidate_path(path);
    }

    /// Number of entries currently cached for this scope.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn storage_root(&self) -> &str {
        &self.root
    }

    pub(crate) fn driver(&self) -> &Arc<dyn StorageDriver> {
        &self.driver
    }
}

//! The per-process registry of scoped filesystems.
//!
//! An explicitly constructed, injected object rather than a module-level
//! singleton, so tests create isolated instances with their own drivers
//! and caches. The registry is the only owner of the scope-to-filesystem
//! mapping; instances are created on first use and live for the life of
//! the process.

use crate::scoped::ScopedGhost;
use ghost_core::{CacheKey, GhostConfig, Result, ScopeId, StorageDriver};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Capacity of the process-wide change-event channel.
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Memoizing factory of [`ScopedGhost`] instances.
///
/// One instance exists per scope per process, so every consumer shares one
/// cache and one listener set. Entries are never removed during normal
/// operation; tenant teardown is the lifecycle manager's concern.
///
/// # Examples
///
/// ```no_run
/// use ghost_core::{GhostConfig, ScopeId};
/// use ghost_storage::DiskDriver;
/// use ghost_vfs::GhostRegistry;
/// use std::sync::Arc;
///
/// # async fn example() -> ghost_core::Result<()> {
/// let driver = Arc::new(DiskDriver::new("./storage").await?);
/// let registry = GhostRegistry::new(driver, GhostConfig::default());
///
/// let scope = ScopeId::bot("bot-7")?;
/// let ghost = registry.for_scope(&scope)?;
/// let same = registry.for_scope(&scope)?;
/// assert!(Arc::ptr_eq(&ghost, &same));
/// # Ok(())
/// # }
/// ```
pub struct GhostRegistry {
    driver: Arc<dyn StorageDriver>,
    config: GhostConfig,
    events: broadcast::Sender<String>,
    scopes: Mutex<HashMap<ScopeId, Arc<ScopedGhost>>>,
}

impl std::fmt::Debug for GhostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhostRegistry")
            .field("scopes", &self.scopes.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

impl GhostRegistry {
    /// Creates a registry over one storage driver.
    #[must_use]
    pub fn new(driver: Arc<dyn StorageDriver>, config: GhostConfig) -> Self {
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            driver,
            config,
            events,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the scoped filesystem for `scope`, constructing it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidScope` for a bot scope whose identifier
    /// fails validation.
    pub fn for_scope(&self, scope: &ScopeId) -> Result<Arc<ScopedGhost>> {
        // Re-validate bot ids here: the enum variant is public and this is
        // the last gate before a filesystem object exists for the id.
        if let ScopeId::Bot(id) = scope {
            ScopeId::bot(id.clone())?;
        }

        let mut scopes = self.scopes.lock().unwrap();
        if let Some(existing) = scopes.get(scope) {
            return Ok(Arc::clone(existing));
        }

        let ghost = Arc::new(ScopedGhost::with_events(
            Some(scope.clone()),
            scope.base_prefix(),
            Arc::clone(&self.driver),
            &self.config,
            self.events.clone(),
        )?);
        scopes.insert(scope.clone(), Arc::clone(&ghost));
        tracing::debug!(scope = %scope, "constructed scoped filesystem");
        Ok(ghost)
    }

    /// Returns the global-scope filesystem.
    ///
    /// # Errors
    ///
    /// Never fails for the global scope; the `Result` keeps the consumer
    /// contract uniform.
    pub fn global(&self) -> Result<Arc<ScopedGhost>> {
        self.for_scope(&ScopeId::Global)
    }

    /// Returns the studio-scope filesystem.
    ///
    /// # Errors
    ///
    /// Never fails for the studio scope; the `Result` keeps the consumer
    /// contract uniform.
    pub fn studio(&self) -> Result<Arc<ScopedGhost>> {
        self.for_scope(&ScopeId::Studio)
    }

    /// Subscribes to change events across every scope in this process.
    ///
    /// Events carry the full normalized path (scope prefix included).
    #[must_use]
    pub fn on_file_changed(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Invalidates one cache entry, routing the key to its scope.
    ///
    /// This is the entry point for remote and administrative
    /// invalidations: the key's path determines the owning scope, whose
    /// cache drops both the addressed entry and nothing else.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidScope` when the key names an invalid bot
    /// scope.
    pub fn invalidate_key(&self, key: &CacheKey) -> Result<()> {
        let (scope, _) = ScopeId::parse_prefix(key.path())?;
        let ghost = self.for_scope(&scope)?;
        ghost.invalidate_cached(key);
        Ok(())
    }

    /// Drops every memoized instance.
    ///
    /// Explicit teardown for tests; production processes never call this.
    pub fn teardown(&self) {
        self.scopes.lock().unwrap().clear();
    }
}

//! Wiring between a process's registry and the broadcast bus.

use crate::bus::{InvalidationMessage, ProcessBus};
use ghost_core::{CacheKey, Result};
use ghost_vfs::GhostRegistry;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Keeps this process's caches coherent with every other process.
///
/// Two directions of flow:
/// - local change events (from the registry) are re-broadcast as one
///   message per cache kind, so receivers drop both views of the file;
/// - remote messages are parsed through the shared
///   [`CacheKey::parse`] contract and applied to the local caches.
///
/// A process's own messages come back over the bus and are skipped by
/// origin id: the local cache was already updated synchronously on the
/// write path, so re-invalidating would only discard fresh content.
///
/// # Examples
///
/// ```no_run
/// use ghost_core::GhostConfig;
/// use ghost_storage::DiskDriver;
/// use ghost_sync::{CacheSynchronizer, LoopbackBus};
/// use ghost_vfs::GhostRegistry;
/// use std::sync::Arc;
///
/// # async fn example() -> ghost_core::Result<()> {
/// let driver = Arc::new(DiskDriver::new("./storage").await?);
/// let registry = Arc::new(GhostRegistry::new(driver, GhostConfig::default()));
/// let bus = Arc::new(LoopbackBus::new());
///
/// let sync = CacheSynchronizer::new(Arc::clone(&registry), bus);
/// let _publisher = sync.spawn_publisher();
/// let _applier = sync.spawn_applier();
/// # Ok(())
/// # }
/// ```
pub struct CacheSynchronizer {
    process_id: Uuid,
    registry: Arc<GhostRegistry>,
    bus: Arc<dyn ProcessBus>,
}

impl std::fmt::Debug for CacheSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSynchronizer")
            .field("process_id", &self.process_id)
            .finish_non_exhaustive()
    }
}

impl CacheSynchronizer {
    /// Creates a synchronizer with a fresh process identity.
    #[must_use]
    pub fn new(registry: Arc<GhostRegistry>, bus: Arc<dyn ProcessBus>) -> Self {
        Self {
            process_id: Uuid::new_v4(),
            registry,
            bus,
        }
    }

    /// This process's identity on the bus.
    #[must_use]
    pub const fn process_id(&self) -> Uuid {
        self.process_id
    }

    /// Spawns the task forwarding local change events to the bus.
    ///
    /// Each changed path is published as two messages, one per cache kind,
    /// matching the single-key invalidation endpoint on the receiving
    /// side.
    pub fn spawn_publisher(&self) -> JoinHandle<()> {
        let mut changes = self.registry.on_file_changed();
        let bus = Arc::clone(&self.bus);
        let origin = self.process_id;

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(path) => {
                        for key in [CacheKey::buffer(&path), CacheKey::object(&path)] {
                            let message = InvalidationMessage {
                                origin,
                                key: key.to_string(),
                            };
                            if let Err(e) = bus.publish(message).await {
                                tracing::warn!(path, error = %e, "failed to broadcast invalidation");
                            }
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "change event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Spawns the task applying bus messages to the local caches.
    pub fn spawn_applier(&self) -> JoinHandle<()> {
        let mut messages = self.bus.subscribe();
        let registry = Arc::clone(&self.registry);
        let origin = self.process_id;

        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(message) => {
                        if message.origin == origin {
                            continue;
                        }
                        if let Err(e) = apply_key(&registry, &message.key) {
                            tracing::warn!(key = message.key, error = %e, "ignoring invalidation");
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "invalidation stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Forces invalidation of one cache key in this process.
    ///
    /// The administrative endpoint: used by the broadcast mechanism above
    /// and, in degraded or manual-ops mode, by a direct operator action.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed key or an invalid scope.
    pub fn invalidate_key(&self, raw_key: &str) -> Result<()> {
        apply_key(&self.registry, raw_key)
    }
}

/// Parses a wire key and drops the addressed entry.
fn apply_key(registry: &GhostRegistry, raw_key: &str) -> Result<()> {
    let key = CacheKey::parse(raw_key)?;
    registry.invalidate_key(&key)?;
    tracing::debug!(key = raw_key, "invalidated cache entry");
    Ok(())
}

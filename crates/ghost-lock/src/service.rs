//! The in-memory lock store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from lock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The resource is held by another owner.
    ///
    /// Callers map this to a conflict response; it is the signal that a
    /// second editor tried to take over a live editing session.
    #[error("Resource '{resource}' is locked by '{owner}'")]
    Held {
        /// The contested resource.
        resource: String,
        /// The current owner.
        owner: String,
    },

    /// Release attempted by an owner that does not hold the lock.
    #[error("Resource '{resource}' is not held by '{owner}'")]
    NotOwner {
        /// The resource.
        resource: String,
        /// The rejected releaser.
        owner: String,
    },

    /// Release attempted on an unheld resource.
    #[error("Resource '{resource}' is not locked")]
    NotHeld {
        /// The resource.
        resource: String,
    },
}

impl LockError {
    /// Returns `true` if this is a lock-contention error.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        matches!(self, Self::Held { .. })
    }
}

/// Result type alias for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// A time-boxed ownership record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// The holder's identity.
    pub owner: String,
    /// When the lock was acquired or last refreshed.
    pub acquired_at: DateTime<Utc>,
    /// Seconds until the lock expires unless refreshed.
    pub ttl_seconds: u64,
}

impl LockEntry {
    /// Returns `true` once the TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = Duration::seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX));
        now >= self.acquired_at + ttl
    }
}

/// In-memory key/value store of resource locks.
///
/// # Thread Safety
///
/// Individual acquire/release calls are atomic with respect to each other.
///
/// # Examples
///
/// ```
/// use ghost_lock::LockService;
///
/// let locks = LockService::new();
/// locks.acquire("flows/main.flow.json", "editor-1", 60).unwrap();
///
/// // A second editor gets a conflict, the first refreshes freely.
/// assert!(locks.acquire("flows/main.flow.json", "editor-2", 60).is_err());
/// assert!(locks.acquire("flows/main.flow.json", "editor-1", 60).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct LockService {
    entries: Mutex<HashMap<String, LockEntry>>,
}

impl LockService {
    /// Creates an empty lock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires or refreshes the lock on `resource` for `owner`.
    ///
    /// Succeeds when the resource is unheld, its lock has expired, or the
    /// same owner already holds it (refreshing the TTL).
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Held`] when another owner holds an unexpired
    /// lock.
    pub fn acquire(&self, resource: &str, owner: &str, ttl_seconds: u64) -> Result<LockEntry> {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();

        if let Some(existing) = entries.get(resource) {
            if existing.owner != owner && !existing.is_expired(now) {
                return Err(LockError::Held {
                    resource: resource.to_string(),
                    owner: existing.owner.clone(),
                });
            }
            if existing.owner != owner {
                tracing::debug!(resource, previous = existing.owner, owner, "lock expired, taken over");
            }
        }

        let entry = LockEntry {
            owner: owner.to_string(),
            acquired_at: now,
            ttl_seconds,
        };
        entries.insert(resource.to_string(), entry.clone());
        Ok(entry)
    }

    /// Releases the lock on `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::NotHeld`] for an unheld resource and
    /// [`LockError::NotOwner`] when someone else holds it.
    pub fn release(&self, resource: &str, owner: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(resource) {
            None => Err(LockError::NotHeld {
                resource: resource.to_string(),
            }),
            Some(existing) if existing.owner != owner => Err(LockError::NotOwner {
                resource: resource.to_string(),
                owner: owner.to_string(),
            }),
            Some(_) => {
                entries.remove(resource);
                Ok(())
            }
        }
    }

    /// Returns the current unexpired holder of `resource`, if any.
    #[must_use]
    pub fn holder(&self, resource: &str) -> Option<LockEntry> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(resource)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .cloned()
    }
}

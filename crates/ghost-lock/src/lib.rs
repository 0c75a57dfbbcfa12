//! Optimistic per-resource locking with time-boxed ownership.
//!
//! Consumers that edit shared documents (the flow editor above the scoped
//! filesystem, for one) need "exactly one writer at a time". The
//! filesystem itself provides no cross-operation transactions, so this
//! crate layers a small lock service on top of it — never inside it.
//!
//! A lock is `{owner, acquired_at, ttl}`: acquiring succeeds when the
//! resource is unheld, expired, or already held by the same owner (which
//! refreshes the TTL). Any other owner fails with a distinct
//! [`LockError::Held`] the caller maps to a conflict response.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod service;

pub use service::{LockEntry, LockError, LockService, Result};

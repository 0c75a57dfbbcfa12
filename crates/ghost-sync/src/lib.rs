//! Cross-process cache invalidation for the Ghost scoped filesystem.
//!
//! Multiple server processes share one underlying storage medium but keep
//! independent in-process caches. This crate fans local change events out
//! to every cooperating process over a broadcast bus, and applies remote
//! invalidations to the local caches, so all processes converge on the
//! storage driver as ground truth.
//!
//! Invalidation is eventually consistent: a process may observe a stale
//! cached value for a bounded window after a remote write, until the
//! broadcast message is delivered. Within a process the write path stays
//! synchronous-before-return.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod bus;
mod synchronizer;

pub use bus::{InvalidationMessage, LoopbackBus, ProcessBus};
pub use synchronizer::CacheSynchronizer;

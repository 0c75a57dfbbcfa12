//! In-process content cache for the Ghost scoped filesystem.
//!
//! Holds two independently invalidatable views of each logical file: the
//! raw bytes and the parsed JSON value. Correctness comes entirely from
//! explicit invalidation — there is no TTL and no eviction, because a stale
//! entry here is a correctness bug, not a performance trade-off.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod memory;

pub use memory::{CachedValue, MemoryContentCache};

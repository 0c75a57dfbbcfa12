//! Core traits for the Ghost scoped filesystem.
//!
//! The one trait seam in the subsystem is the storage driver: a narrow,
//! byte-oriented interface implemented per storage medium. Everything above
//! it (cache, façade, registry) is concrete.

mod storage;

pub use storage::{ListOptions, SortOrder, StorageDriver};

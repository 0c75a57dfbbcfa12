//! Scoped filesystem façade for the Ghost subsystem.
//!
//! This crate is the per-tenant face of the storage stack: it normalizes
//! and sanitizes paths, enforces per-file size ceilings, wraps reads and
//! writes with the content cache, emits change events, and offers the
//! higher-level flows (directory listing with glob filtering, bulk
//! import, archive export with text substitution).
//!
//! # Architecture
//!
//! ```text
//! feature service
//!     └── GhostRegistry::for_scope(id)
//!             └── ScopedGhost ── MemoryContentCache
//!                     └── dyn StorageDriver (disk, ...)
//! ```
//!
//! Every feature service goes through the registry; nothing above this
//! crate talks to a storage driver directly.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod archive;
mod path;
mod registry;
mod scoped;

pub use archive::TextSubstitution;
pub use path::sanitize_segment;
pub use registry::GhostRegistry;
pub use scoped::{DirectoryListingOptions, ScopedGhost, UpsertOptions};

//! Strong domain types for the Ghost scoped filesystem.
//!
//! This module implements the newtype/closed-enum pattern for the domain
//! primitives: tenant scopes, cache keys and revision records. Strong types
//! keep scope identifiers, cache keys and plain strings from being mixed up
//! at call sites.
//!
//! # Examples
//!
//! ```
//! use ghost_core::{CacheKey, ScopeId};
//!
//! let scope = ScopeId::bot("bot-7").unwrap();
//! assert_eq!(scope.base_prefix(), "bots/bot-7");
//!
//! let key = CacheKey::buffer("bots/bot-7/flows/main.flow.json");
//! assert_eq!(key.to_string(), "buffer::bots/bot-7/flows/main.flow.json");
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length for a bot identifier.
const MAX_BOT_ID_LEN: usize = 50;

/// Reserved spelling of the global scope.
const GLOBAL_SENTINEL: &str = "__global__";

/// Reserved spelling of the studio-internal scope.
const STUDIO_SENTINEL: &str = "__studio__";

/// A tenant scope under which file paths are resolved.
///
/// Every filesystem operation is implicitly rooted under a scope-specific
/// base path: the storage root for [`ScopeId::Global`], `studio/` for
/// [`ScopeId::Studio`] and `bots/{id}/` for [`ScopeId::Bot`].
///
/// Bot identifiers are validated on construction; an invalid id fails fast
/// before any filesystem object is built for it.
///
/// # Examples
///
/// ```
/// use ghost_core::ScopeId;
///
/// let scope = ScopeId::bot("support-bot").unwrap();
/// assert_eq!(scope.base_prefix(), "bots/support-bot");
///
/// assert!(ScopeId::bot("../escape").is_err());
/// assert!(ScopeId::bot("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeId {
    /// The global namespace, rooted at the storage root.
    Global,
    /// The studio-internal namespace.
    Studio,
    /// A per-bot namespace, rooted under `bots/{id}`.
    Bot(String),
}

impl ScopeId {
    /// Creates a bot scope, validating the identifier.
    ///
    /// Identifiers must be 1-50 characters of lowercase ASCII alphanumerics,
    /// `-` or `_`, starting with an alphanumeric.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] when the identifier is empty, too
    /// long, or contains characters outside the allowed set.
    pub fn bot(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidScope {
                scope: id,
                reason: "bot id cannot be empty".to_string(),
            });
        }
        if id.len() > MAX_BOT_ID_LEN {
            return Err(Error::InvalidScope {
                scope: id,
                reason: format!("bot id exceeds {MAX_BOT_ID_LEN} characters"),
            });
        }
        let first_ok = id
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let rest_ok = id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !first_ok || !rest_ok {
            return Err(Error::InvalidScope {
                scope: id,
                reason: "bot id must be lowercase alphanumerics, '-' or '_', starting with an alphanumeric"
                    .to_string(),
            });
        }
        Ok(Self::Bot(id))
    }

    /// Returns the base path prefix this scope is rooted under.
    ///
    /// The prefix is relative to the storage root and never ends with a
    /// separator.
    #[must_use]
    pub fn base_prefix(&self) -> String {
        match self {
            Self::Global => String::new(),
            Self::Studio => "studio".to_string(),
            Self::Bot(id) => format!("bots/{id}"),
        }
    }

    /// Maps a normalized storage path back to its scope and relative path.
    ///
    /// This is the inverse of prefix resolution, used by the distributed
    /// invalidation layer to route a wire-level cache key to the right
    /// scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] when the path names a bot segment
    /// with an invalid identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use ghost_core::ScopeId;
    ///
    /// let (scope, rel) = ScopeId::parse_prefix("bots/bot-7/flows/main.flow.json").unwrap();
    /// assert_eq!(scope, ScopeId::bot("bot-7").unwrap());
    /// assert_eq!(rel, "flows/main.flow.json");
    ///
    /// let (scope, rel) = ScopeId::parse_prefix("config/ui.config.json").unwrap();
    /// assert_eq!(scope, ScopeId::Global);
    /// assert_eq!(rel, "config/ui.config.json");
    /// ```
    pub fn parse_prefix(path: &str) -> Result<(Self, String)> {
        let path = path.trim_start_matches('/');
        if let Some(rest) = path.strip_prefix("bots/") {
            let (id, rel) = rest.split_once('/').unwrap_or((rest, ""));
            let scope = Self::bot(id)?;
            return Ok((scope, rel.to_string()));
        }
        if let Some(rest) = path.strip_prefix("studio/") {
            return Ok((Self::Studio, rest.to_string()));
        }
        Ok((Self::Global, path.to_string()))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "{GLOBAL_SENTINEL}"),
            Self::Studio => write!(f, "{STUDIO_SENTINEL}"),
            Self::Bot(id) => write!(f, "{id}"),
        }
    }
}

/// The two independently cached views of one file.
///
/// `Buffer` holds the raw bytes; `Object` holds the parsed JSON value. The
/// two kinds are invalidated together whenever the underlying file changes
/// but stored and looked up independently, so a consumer that only needs
/// bytes never pays parse cost and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Raw byte content.
    Buffer,
    /// Parsed (JSON-decoded) content.
    Object,
}

impl CacheKind {
    /// Returns the canonical wire spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::Object => "object",
        }
    }

    /// Parses the canonical wire spelling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for anything other than `buffer` or
    /// `object`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "buffer" => Ok(Self::Buffer),
            "object" => Ok(Self::Object),
            other => Err(Error::InvalidPath {
                path: other.to_string(),
                reason: "unknown cache kind".to_string(),
            }),
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key of one content cache entry: a cache kind plus a normalized path.
///
/// The canonical wire spelling is `{kind}::{normalizedPath}`. Any two
/// cooperating processes must agree on exactly this format; [`CacheKey::parse`]
/// is the shared parsing contract.
///
/// # Examples
///
/// ```
/// use ghost_core::{CacheKey, CacheKind};
///
/// let key = CacheKey::object("bots/bot-7/bot.config.json");
/// assert_eq!(key.kind(), CacheKind::Object);
///
/// let parsed = CacheKey::parse(&key.to_string()).unwrap();
/// assert_eq!(parsed, key);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: CacheKind,
    path: String,
}

impl CacheKey {
    /// Creates a buffer-kind key for a normalized path.
    #[must_use]
    pub fn buffer(path: impl Into<String>) -> Self {
        Self {
            kind: CacheKind::Buffer,
            path: path.into(),
        }
    }

    /// Creates an object-kind key for a normalized path.
    #[must_use]
    pub fn object(path: impl Into<String>) -> Self {
        Self {
            kind: CacheKind::Object,
            path: path.into(),
        }
    }

    /// Returns the cache kind of this key.
    #[must_use]
    pub const fn kind(&self) -> CacheKind {
        self.kind
    }

    /// Returns the normalized path of this key.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the key for the other cache kind of the same path.
    #[must_use]
    pub fn sibling(&self) -> Self {
        let kind = match self.kind {
            CacheKind::Buffer => CacheKind::Object,
            CacheKind::Object => CacheKind::Buffer,
        };
        Self {
            kind,
            path: self.path.clone(),
        }
    }

    /// Parses a wire-level cache key.
    ///
    /// Applies the disk-medium compatibility rule: a leading `data/` segment
    /// on the path component is stripped, so keys minted by a process whose
    /// storage medium prefixes paths with `data/` invalidate correctly on a
    /// disk-medium process. Both sides must apply this rule identically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] when the key has no `::` separator or
    /// an unknown kind.
    pub fn parse(raw: &str) -> Result<Self> {
        let Some((kind, path)) = raw.split_once("::") else {
            return Err(Error::InvalidPath {
                path: raw.to_string(),
                reason: "cache key must be '{kind}::{path}'".to_string(),
            });
        };
        let kind = CacheKind::parse(kind)?;
        let path = path.trim_start_matches('/');
        let path = path.strip_prefix("data/").unwrap_or(path);
        Ok(Self {
            kind,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.kind, self.path)
    }
}

/// A best-effort file revision record.
///
/// Appended per mutation when revision recording is requested; queried as a
/// list per path prefix. Never the source of truth for content — drivers
/// that do not record revisions are valid implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Logical path the revision applies to.
    pub path: String,
    /// Opaque revision identifier.
    pub revision: String,
    /// Author of the change.
    pub author: String,
    /// When the revision was recorded.
    pub created_on: DateTime<Utc>,
}

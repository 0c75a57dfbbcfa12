//! Configuration types for the Ghost scoped filesystem.
//!
//! Configuration is plain construction-time data: a size-ceiling table and
//! the per-scope sanitization switch. There is no config-file parsing at
//! this layer; deployments build a [`GhostConfig`] and hand it to the
//! registry.
//!
//! # Examples
//!
//! ```
//! use ghost_core::{GhostConfig, SizeLimits};
//!
//! let config = GhostConfig::default();
//! assert!(config.sanitize_filenames);
//!
//! let custom = GhostConfig {
//!     limits: SizeLimits {
//!         default_bytes: 1024,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert_eq!(custom.limits.limit_for("bot.config.json"), 1024);
//! ```

/// Default ceiling for ordinary text/JSON files: 10 MiB.
const DEFAULT_FILE_LIMIT: u64 = 10 * 1024 * 1024;

/// Default ceiling for large binary model artifacts: 200 MiB.
const DEFAULT_MODEL_LIMIT: u64 = 200 * 1024 * 1024;

/// Per-file-extension size ceilings.
///
/// A higher ceiling applies to large binary model artifacts than to
/// ordinary text/JSON files. An upsert whose content exceeds the ceiling
/// for its extension is rejected before any driver call.
#[derive(Debug, Clone)]
pub struct SizeLimits {
    /// Ceiling in bytes for ordinary files.
    pub default_bytes: u64,
    /// Ceiling in bytes for model artifacts.
    pub model_bytes: u64,
    /// Extensions (with leading dot) treated as model artifacts.
    pub model_extensions: Vec<String>,
}

impl SizeLimits {
    /// Returns the ceiling in bytes that applies to `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ghost_core::SizeLimits;
    ///
    /// let limits = SizeLimits::default();
    /// assert!(limits.limit_for("nlu/model.bin") > limits.limit_for("flows/main.flow.json"));
    /// ```
    #[must_use]
    pub fn limit_for(&self, path: &str) -> u64 {
        let is_model = self
            .model_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()));
        if is_model {
            self.model_bytes
        } else {
            self.default_bytes
        }
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            default_bytes: DEFAULT_FILE_LIMIT,
            model_bytes: DEFAULT_MODEL_LIMIT,
            model_extensions: vec![".model".to_string(), ".bin".to_string()],
        }
    }
}

/// Construction-time configuration for scoped filesystems.
#[derive(Debug, Clone)]
pub struct GhostConfig {
    /// Run each path segment through filename sanitization.
    ///
    /// Export/import flows need the unsanitized absolute path preserved and
    /// construct their scopes with this disabled.
    /// Default: true
    pub sanitize_filenames: bool,

    /// Size ceilings applied on every upsert.
    pub limits: SizeLimits,
}

impl GhostConfig {
    /// Returns the default configuration.
    ///
    /// Same as `Default`, spelled out for call sites that read better with
    /// an explicit constructor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            sanitize_filenames: true,
            limits: SizeLimits::default(),
        }
    }
}

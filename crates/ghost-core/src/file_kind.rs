//! Closed enumeration of well-known file kinds.
//!
//! The larger system routes a handful of special file kinds (actions,
//! hooks, configuration documents) through the scoped filesystem. Each kind
//! resolves through a single exhaustive match to a fixed descriptor: its
//! base directory, the scopes it is allowed in, and an optional content
//! validator with a fixed signature.

use crate::error::{Error, Result};
use crate::types::ScopeId;

/// Which scopes a file kind may be written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindScope {
    /// Only the global scope.
    GlobalOnly,
    /// Only bot scopes.
    BotOnly,
    /// Any scope.
    Any,
}

impl KindScope {
    /// Returns `true` if `scope` is permitted.
    #[must_use]
    pub fn permits(self, scope: &ScopeId) -> bool {
        match self {
            Self::Any => true,
            Self::GlobalOnly => matches!(scope, ScopeId::Global),
            Self::BotOnly => matches!(scope, ScopeId::Bot(_)),
        }
    }
}

/// Fixed descriptor of a file kind.
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    /// Directory the kind's files live under, relative to the scope root.
    pub base_dir: &'static str,
    /// Scopes the kind may be written under.
    pub scope: KindScope,
    /// Optional content validator, run before any write.
    pub validate: Option<fn(&[u8]) -> Result<()>>,
}

/// Well-known file kinds routed through the scoped filesystem.
///
/// A closed, tagged enumeration rather than a lookup table: adding a kind
/// means adding a variant, and every dispatch site is an exhaustive match.
///
/// # Examples
///
/// ```
/// use ghost_core::{FileKind, ScopeId};
///
/// let desc = FileKind::BotConfig.descriptor();
/// assert_eq!(desc.base_dir, "");
/// assert!(desc.scope.permits(&ScopeId::bot("bot-7").unwrap()));
/// assert!(!desc.scope.permits(&ScopeId::Global));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// A custom action implementation.
    Action,
    /// A lifecycle hook implementation.
    Hook,
    /// A bot's configuration document.
    BotConfig,
    /// The deployment-wide configuration document.
    MainConfig,
    /// A module's configuration document.
    ModuleConfig,
}

impl FileKind {
    /// Returns the fixed descriptor for this kind.
    #[must_use]
    pub fn descriptor(self) -> KindDescriptor {
        match self {
            Self::Action => KindDescriptor {
                base_dir: "actions",
                scope: KindScope::Any,
                validate: None,
            },
            Self::Hook => KindDescriptor {
                base_dir: "hooks",
                scope: KindScope::GlobalOnly,
                validate: None,
            },
            Self::BotConfig => KindDescriptor {
                base_dir: "",
                scope: KindScope::BotOnly,
                validate: Some(validate_json),
            },
            Self::MainConfig => KindDescriptor {
                base_dir: "config",
                scope: KindScope::GlobalOnly,
                validate: Some(validate_json),
            },
            Self::ModuleConfig => KindDescriptor {
                base_dir: "config",
                scope: KindScope::Any,
                validate: Some(validate_json),
            },
        }
    }

    /// Runs the kind's scope rule and content validator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] when the kind is not allowed under
    /// `scope`, or the validator's error for malformed content.
    pub fn check(self, scope: &ScopeId, name: &str, content: &[u8]) -> Result<()> {
        let descriptor = self.descriptor();
        if !descriptor.scope.permits(scope) {
            return Err(Error::InvalidScope {
                scope: scope.to_string(),
                reason: format!("{self:?} files are not allowed under this scope"),
            });
        }
        if let Some(validate) = descriptor.validate {
            validate(content).map_err(|err| match err {
                Error::Parse { reason, .. } => Error::Parse {
                    path: name.to_string(),
                    reason,
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Validator for JSON document kinds.
fn validate_json(content: &[u8]) -> Result<()> {
    serde_json::from_slice::<serde_json::Value>(content).map_err(|e| Error::Parse {
        path: String::new(),
        reason: e.to_string(),
    })?;
    Ok(())
}

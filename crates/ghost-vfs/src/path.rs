//! Path normalization and filename sanitization.
//!
//! Normalization is the single code path every cache key derives from: a
//! write and a subsequent read of "the same" file must agree on the key,
//! so the façade funnels every operation through [`normalize_path`].

use ghost_core::{Error, Result};

/// Characters stripped from path segments when sanitization is enabled.
///
/// These are unsafe for at least one supported storage medium.
const UNSAFE_CHARS: [char; 7] = ['*', '?', ':', '|', '"', '<', '>'];

/// Strips characters unsafe for the storage medium from one path segment.
///
/// Idempotent: sanitizing an already-sanitized segment is a no-op.
///
/// # Examples
///
/// ```
/// use ghost_vfs::sanitize_segment;
///
/// assert_eq!(sanitize_segment("what?.json"), "what.json");
/// assert_eq!(sanitize_segment("main.flow.json"), "main.flow.json");
/// ```
#[must_use]
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| !UNSAFE_CHARS.contains(c) && !c.is_control())
        .collect()
}

/// Joins path parts onto a scope prefix and normalizes the result.
///
/// Backslashes collapse to forward slashes, redundant separators are
/// dropped, and `.`/`..` segments are rejected so no path can escape its
/// scope. The result is storage-root relative with no leading slash.
///
/// Normalization is idempotent; callers may re-normalize freely.
pub(crate) fn normalize_path(prefix: &str, parts: &[&str], sanitize: bool) -> Result<String> {
    let raw = parts.join("/");
    let joined = format!("{prefix}/{raw}");
    let joined = joined.replace('\\', "/");

    let mut segments = Vec::new();
    for segment in joined.split('/') {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." {
            return Err(Error::InvalidPath {
                path: raw,
                reason: "path must not contain '.' or '..' segments".to_string(),
            });
        }
        let segment = if sanitize {
            sanitize_segment(segment)
        } else {
            segment.to_string()
        };
        if segment.is_empty() {
            return Err(Error::InvalidPath {
                path: raw,
                reason: "path segment is empty after sanitization".to_string(),
            });
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(Error::InvalidPath {
            path: raw,
            reason: "path resolves to the scope root".to_string(),
        });
    }
    Ok(segments.join("/"))
}

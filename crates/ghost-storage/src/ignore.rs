//! Ghost-ignore file handling and exclude-glob compilation.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Reads the ghost-ignore file at `path` into a list of glob patterns.
///
/// The file is one glob per line, `\n` or `\r\n` delimited; empty lines are
/// skipped. An absent or unreadable file means no additional excludes.
pub(crate) async fn load_ignore_patterns(path: &Path) -> Vec<String> {
    let Ok(content) = tokio::fs::read_to_string(path).await else {
        return Vec::new();
    };
    content
        .lines()
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Compiles glob patterns into one matcher.
///
/// Patterns match anywhere in the relative path (`*` crosses directory
/// separators, so `*.tmp` excludes nested files too). Invalid patterns are
/// skipped with a warning rather than failing the listing.
pub(crate) fn build_exclude_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                tracing::warn!(pattern, error = %e, "skipping invalid exclude pattern");
            }
        }
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to build exclude set, excluding nothing");
        GlobSet::empty()
    })
}

//! Archive export and bulk import flows.
//!
//! Exports walk the scope's full enumeration into a temporary staging
//! tree, optionally rewrite tenant-identifying substrings across all
//! `.json` files, and package the tree as a gzip'd tarball returned
//! in-memory. The staging tree is a scoped resource: it is removed on
//! success and failure alike.

use crate::scoped::{ScopedGhost, UpsertOptions};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ghost_core::{Error, ListOptions, Result};
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A literal find/replace applied to all `.json` files before packaging.
///
/// Used to neutralize tenant-identifying paths so an exported archive is
/// portable across tenants.
#[derive(Debug, Clone)]
pub struct TextSubstitution {
    /// Literal substring to search for.
    pub from: String,
    /// Replacement substring.
    pub to: String,
}

fn archive_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Archive {
        reason: format!("{context}: {e}"),
    }
}

impl ScopedGhost {
    /// Copies every file of the scope into `dest`, preserving relative
    /// paths. Returns the copied paths.
    ///
    /// Reads go straight through the driver so the on-disk bytes are
    /// exported verbatim, without populating the cache.
    ///
    /// # Errors
    ///
    /// The driver's I/O errors, or [`Error::Io`] when writing `dest`.
    pub async fn export_to_directory(
        &self,
        dest: &Path,
        exclude_patterns: &[String],
    ) -> Result<Vec<String>> {
        let root = self.storage_root().to_string();
        let listing = self
            .driver()
            .list(
                &root,
                &ListOptions {
                    exclude_patterns: exclude_patterns.to_vec(),
                    ..Default::default()
                },
            )
            .await?;

        for relative in &listing {
            let source = if root.is_empty() {
                relative.clone()
            } else {
                format!("{root}/{relative}")
            };
            let content = self.driver().read(&source).await?;

            let target = dest.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::io("export", relative.clone(), e))?;
            }
            tokio::fs::write(&target, content)
                .await
                .map_err(|e| Error::io("export", relative.clone(), e))?;
        }

        tracing::info!(
            scope = root,
            files = listing.len(),
            "exported scope to directory"
        );
        Ok(listing)
    }

    /// Packages the scope into an in-memory gzip'd tarball.
    ///
    /// Entry paths are the scope-relative logical paths. When
    /// `substitution` is given, a literal find/replace runs across all
    /// `.json` files in the staging tree before packaging.
    ///
    /// # Errors
    ///
    /// Everything [`export_to_directory`](Self::export_to_directory)
    /// returns, plus [`Error::Archive`] for packaging failures.
    pub async fn export_to_archive(
        &self,
        exclude_patterns: &[String],
        substitution: Option<&TextSubstitution>,
    ) -> Result<Vec<u8>> {
        // TempDir removes the staging tree on drop, on every return path.
        let staging = TempDir::new().map_err(|e| archive_err("create staging directory", e))?;
        self.export_to_directory(staging.path(), exclude_patterns)
            .await?;

        if let Some(substitution) = substitution {
            substitute_in_json_files(staging.path(), substitution).await?;
        }

        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder
            .append_dir_all(".", staging.path())
            .map_err(|e| archive_err("append staging tree", e))?;
        let encoder = builder
            .into_inner()
            .map_err(|e| archive_err("finish tar stream", e))?;
        let bytes = encoder
            .finish()
            .map_err(|e| archive_err("finish gzip stream", e))?;

        tracing::info!(bytes = bytes.len(), "packaged scope archive");
        Ok(bytes)
    }

    /// Bulk-upserts every file under `src` into the scope.
    ///
    /// Returns the number of imported files. Each file goes through the
    /// regular upsert path, so size ceilings, cache write-through and
    /// change events all apply.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] when reading `src`, or anything
    /// [`upsert_file`](Self::upsert_file) returns.
    pub async fn import_from_directory(&self, src: &Path) -> Result<usize> {
        let mut imported = 0;
        for entry in WalkDir::new(src).into_iter().filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(src) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            let (dir, name) = match relative.rsplit_once('/') {
                Some((dir, name)) => (dir.to_string(), name.to_string()),
                None => (String::new(), relative.clone()),
            };

            let content = tokio::fs::read(entry.path())
                .await
                .map_err(|e| Error::io("import", relative.clone(), e))?;
            self.upsert_file(&dir, &name, content, &UpsertOptions::default())
                .await?;
            imported += 1;
        }

        tracing::info!(files = imported, "imported directory into scope");
        Ok(imported)
    }

    /// Unpacks a gzip'd tarball and bulk-upserts its entries.
    ///
    /// # Errors
    ///
    /// [`Error::Archive`] for a malformed archive, or anything
    /// [`import_from_directory`](Self::import_from_directory) returns.
    pub async fn import_from_archive(&self, bytes: &[u8]) -> Result<usize> {
        let staging = TempDir::new().map_err(|e| archive_err("create staging directory", e))?;

        let decoder = GzDecoder::new(bytes);
        let mut archive = tar::Archive::new(decoder);
        archive
            .unpack(staging.path())
            .map_err(|e| archive_err("unpack archive", e))?;

        self.import_from_directory(staging.path()).await
    }
}

/// Rewrites a literal substring across every `.json` file under `root`.
async fn substitute_in_json_files(root: &Path, substitution: &TextSubstitution) -> Result<()> {
    for entry in WalkDir::new(root).into_iter().filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let display = entry.path().display().to_string();
        let content = tokio::fs::read_to_string(entry.path())
            .await
            .map_err(|e| Error::io("substitute", display.clone(), e))?;
        if !content.contains(&substitution.from) {
            continue;
        }
        let rewritten = content.replace(&substitution.from, &substitution.to);
        tokio::fs::write(entry.path(), rewritten)
            .await
            .map_err(|e| Error::io("substitute", display, e))?;
    }
    Ok(())
}

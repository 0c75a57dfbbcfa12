//! Disk-backed storage driver.
//!
//! Resolves logical paths under `<root>/data/` and performs all I/O through
//! `tokio::fs`. Writes are staged to a temporary sibling and renamed into
//! place, so a failed write never leaves partial content at the target
//! path.

use crate::ignore::{build_exclude_set, load_ignore_patterns};
use async_trait::async_trait;
use chrono::Utc;
use ghost_core::{Error, ListOptions, Result, Revision, SortOrder, StorageDriver};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Well-known ghost-ignore file name, relative to the data directory.
const GHOSTIGNORE_FILE: &str = ".ghostignore";

/// Sidecar directory for driver bookkeeping, relative to the data directory.
const SIDECAR_DIR: &str = ".ghost";

/// Best-effort revision history sidecar.
const REVISIONS_FILE: &str = "revisions.json";

/// Disk-backed implementation of [`StorageDriver`].
///
/// # Directory Structure
///
/// ```text
/// root/
/// └── data/
///     ├── .ghostignore          # optional per-deployment excludes
///     ├── .ghost/revisions.json # best-effort history sidecar
///     ├── bots/<bot-id>/...     # bot scopes
///     └── ...                   # global scope
/// ```
///
/// # Examples
///
/// ```no_run
/// use ghost_core::StorageDriver;
/// use ghost_storage::DiskDriver;
///
/// # async fn example() -> ghost_core::Result<()> {
/// let driver = DiskDriver::new("./storage").await?;
/// driver.write("bots/bot-7/bot.config.json", b"{}").await?;
/// assert!(driver.exists("bots/bot-7/bot.config.json").await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DiskDriver {
    data_dir: PathBuf,
}

impl DiskDriver {
    /// Creates a driver rooted at `root`, creating `<root>/data` if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the data directory cannot be created.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let data_dir = root.as_ref().join("data");
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| Error::io("init", data_dir.display().to_string(), e))?;
        tracing::debug!(data_dir = %data_dir.display(), "initialized disk driver");
        Ok(Self { data_dir })
    }

    /// Resolves a logical path to its absolute location on disk.
    fn resolve(&self, path: &str) -> PathBuf {
        self.data_dir.join(path.trim_start_matches('/'))
    }

    fn ghostignore_path(&self) -> PathBuf {
        self.data_dir.join(GHOSTIGNORE_FILE)
    }

    fn revisions_path(&self) -> PathBuf {
        self.data_dir.join(SIDECAR_DIR).join(REVISIONS_FILE)
    }

    /// Reads the revision sidecar, degrading corruption to empty history.
    async fn read_revisions(&self) -> Vec<Revision> {
        let Ok(content) = tokio::fs::read(self.revisions_path()).await else {
            return Vec::new();
        };
        serde_json::from_slice(&content).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "revision sidecar is corrupt, starting fresh");
            Vec::new()
        })
    }
}

#[async_trait]
impl StorageDriver for DiskDriver {
    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io("write", path, e))?;
        }

        // Stage to a sibling and rename so a failure mid-write leaves the
        // previous content intact.
        let file_name = target
            .file_name()
            .map_or_else(|| "staged".to_string(), |n| n.to_string_lossy().into_owned());
        let staged = target.with_file_name(format!("{file_name}.ghost-tmp"));
        if let Err(e) = tokio::fs::write(&staged, content).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(Error::io("write", path, e));
        }
        tokio::fs::rename(&staged, &target)
            .await
            .map_err(|e| Error::io("write", path, e))?;
        tracing::debug!(path, bytes = content.len(), "wrote file");
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        match tokio::fs::read(self.resolve(path)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(Error::io("read", path, e)),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .unwrap_or(false)
    }

    async fn file_size(&self, path: &str) -> Result<u64> {
        // A missing path is an I/O error here, not NotFound: callers that
        // need existence semantics call `exists` first.
        let metadata = tokio::fs::metadata(self.resolve(path))
            .await
            .map_err(|e| Error::io("size", path, e))?;
        Ok(metadata.len())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(self.resolve(path))
            .await
            .map_err(|e| Error::io("delete", path, e))?;
        tracing::debug!(path, "deleted file");
        Ok(())
    }

    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io("move", to, e))?;
        }
        tokio::fs::rename(self.resolve(from), target)
            .await
            .map_err(|e| Error::io("move", from, e))?;
        tracing::debug!(from, to, "moved file");
        Ok(())
    }

    async fn delete_dir(&self, path: &str) -> Result<()> {
        tokio::fs::remove_dir_all(self.resolve(path))
            .await
            .map_err(|e| Error::io("deleteDir", path, e))?;
        tracing::debug!(path, "deleted directory");
        Ok(())
    }

    async fn list(&self, dir: &str, options: &ListOptions) -> Result<Vec<String>> {
        let base = self.resolve(dir);
        if !base.is_dir() {
            // Absent directory is a normal outcome, never an error.
            return Ok(Vec::new());
        }

        let mut patterns = options.exclude_patterns.clone();
        patterns.extend(load_ignore_patterns(&self.ghostignore_path()).await);
        let excludes = build_exclude_set(&patterns);

        let mut entries: Vec<(String, Option<SystemTime>)> = Vec::new();
        for entry in WalkDir::new(&base)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&base) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if !options.include_hidden
                && relative
                    .split('/')
                    .any(|segment| segment.starts_with('.'))
            {
                continue;
            }
            if excludes.is_match(&relative) {
                continue;
            }
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            entries.push((relative, modified));
        }

        match options.sort {
            Some(SortOrder::ModifiedAsc) => entries.sort_by(|a, b| a.1.cmp(&b.1)),
            Some(SortOrder::ModifiedDesc) => entries.sort_by(|a, b| b.1.cmp(&a.1)),
            None => entries.sort_by(|a, b| a.0.cmp(&b.0)),
        }

        Ok(entries.into_iter().map(|(path, _)| path).collect())
    }

    async fn record_revision(&self, path: &str, author: &str) -> Result<()> {
        let mut revisions = self.read_revisions().await;
        revisions.push(Revision {
            path: path.to_string(),
            revision: uuid::Uuid::new_v4().to_string(),
            author: author.to_string(),
            created_on: Utc::now(),
        });

        let sidecar = self.revisions_path();
        if let Some(parent) = sidecar.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io("recordRevision", path, e))?;
        }
        let content = serde_json::to_vec_pretty(&revisions).map_err(|e| Error::Parse {
            path: REVISIONS_FILE.to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&sidecar, content)
            .await
            .map_err(|e| Error::io("recordRevision", path, e))?;
        Ok(())
    }

    async fn list_revisions(&self, prefix: &str) -> Result<Vec<Revision>> {
        let revisions = self.read_revisions().await;
        Ok(revisions
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn driver() -> (TempDir, DiskDriver) {
        let temp = TempDir::new().unwrap();
        let driver = DiskDriver::new(temp.path()).await.unwrap();
        (temp, driver)
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let (_temp, driver) = driver().await;
        driver
            .write("bots/bot-7/flows/main.flow.json", b"{\"nodes\":[]}")
            .await
            .unwrap();

        let content = driver.read("bots/bot-7/flows/main.flow.json").await.unwrap();
        assert_eq!(content, b"{\"nodes\":[]}");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let (_temp, driver) = driver().await;
        driver.write("a.json", b"v1").await.unwrap();
        driver.write("a.json", b"v2").await.unwrap();
        assert_eq!(driver.read("a.json").await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_temp, driver) = driver().await;
        let err = driver.read("missing.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_size_missing_is_io_error() {
        let (_temp, driver) = driver().await;
        let err = driver.file_size("missing.json").await.unwrap_err();
        assert!(err.is_io());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_exists() {
        let (_temp, driver) = driver().await;
        assert!(!driver.exists("a.json").await);
        driver.write("a.json", b"1").await.unwrap();
        assert!(driver.exists("a.json").await);
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (_temp, driver) = driver().await;
        driver.write("a.json", b"1").await.unwrap();
        driver.delete_file("a.json").await.unwrap();
        assert!(!driver.exists("a.json").await);
    }

    #[tokio::test]
    async fn test_move_file_creates_parents() {
        let (_temp, driver) = driver().await;
        driver.write("a.json", b"1").await.unwrap();
        driver.move_file("a.json", "deep/nested/b.json").await.unwrap();

        assert!(!driver.exists("a.json").await);
        assert_eq!(driver.read("deep/nested/b.json").await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn test_delete_dir_recursive() {
        let (_temp, driver) = driver().await;
        driver.write("flows/a.json", b"1").await.unwrap();
        driver.write("flows/sub/b.json", b"2").await.unwrap();

        driver.delete_dir("flows").await.unwrap();
        assert!(!driver.exists("flows/a.json").await);
        assert!(!driver.exists("flows/sub/b.json").await);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let (_temp, driver) = driver().await;
        let listing = driver.list("nowhere", &ListOptions::default()).await.unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn test_list_recursive_relative_paths() {
        let (_temp, driver) = driver().await;
        driver.write("bots/bot-7/flows/main.flow.json", b"{}").await.unwrap();
        driver.write("bots/bot-7/flows/sub/error.flow.json", b"{}").await.unwrap();

        let listing = driver
            .list("bots/bot-7", &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(
            listing,
            vec![
                "flows/main.flow.json".to_string(),
                "flows/sub/error.flow.json".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_list_applies_caller_excludes() {
        let (_temp, driver) = driver().await;
        driver.write("dir/keep.json", b"{}").await.unwrap();
        driver.write("dir/drop.tmp", b"x").await.unwrap();

        let listing = driver
            .list(
                "dir",
                &ListOptions {
                    exclude_patterns: vec!["*.tmp".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listing, vec!["keep.json".to_string()]);
    }

    #[tokio::test]
    async fn test_list_applies_ghostignore() {
        let (temp, driver) = driver().await;
        tokio::fs::write(temp.path().join("data/.ghostignore"), "*.secret\n")
            .await
            .unwrap();
        driver.write("dir/a.json", b"{}").await.unwrap();
        driver.write("dir/b.secret", b"x").await.unwrap();

        let listing = driver.list("dir", &ListOptions::default()).await.unwrap();
        assert_eq!(listing, vec!["a.json".to_string()]);
    }

    #[tokio::test]
    async fn test_list_hides_dotfiles_by_default() {
        let (_temp, driver) = driver().await;
        driver.write("dir/.hidden", b"x").await.unwrap();
        driver.write("dir/visible.json", b"{}").await.unwrap();

        let listing = driver.list("dir", &ListOptions::default()).await.unwrap();
        assert_eq!(listing, vec!["visible.json".to_string()]);

        let listing = driver
            .list(
                "dir",
                &ListOptions {
                    include_hidden: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            listing,
            vec![".hidden".to_string(), "visible.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_list_sorted_by_modified() {
        let (temp, driver) = driver().await;
        driver.write("dir/newer.json", b"{}").await.unwrap();
        driver.write("dir/older.json", b"{}").await.unwrap();

        // Pin mtimes so the ordering does not depend on write timing.
        let older = temp.path().join("data/dir/older.json");
        let file = std::fs::File::options().write(true).open(&older).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH).unwrap();
        drop(file);

        let ascending = driver
            .list(
                "dir",
                &ListOptions {
                    sort: Some(SortOrder::ModifiedAsc),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            ascending,
            vec!["older.json".to_string(), "newer.json".to_string()]
        );

        let descending = driver
            .list(
                "dir",
                &ListOptions {
                    sort: Some(SortOrder::ModifiedDesc),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            descending,
            vec!["newer.json".to_string(), "older.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_revisions_roundtrip() {
        let (_temp, driver) = driver().await;
        driver
            .record_revision("bots/bot-7/flows/main.flow.json", "admin")
            .await
            .unwrap();
        driver
            .record_revision("config/ui.config.json", "root")
            .await
            .unwrap();

        let all = driver.list_revisions("").await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = driver.list_revisions("bots/bot-7").await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].author, "admin");
    }

    #[tokio::test]
    async fn test_corrupt_revision_sidecar_degrades_to_empty() {
        let (temp, driver) = driver().await;
        let sidecar = temp.path().join("data/.ghost");
        tokio::fs::create_dir_all(&sidecar).await.unwrap();
        tokio::fs::write(sidecar.join("revisions.json"), b"{not json")
            .await
            .unwrap();

        assert!(driver.list_revisions("").await.unwrap().is_empty());
        // Recording over a corrupt sidecar starts fresh rather than failing.
        driver.record_revision("a.json", "admin").await.unwrap();
        assert_eq!(driver.list_revisions("").await.unwrap().len(), 1);
    }
}

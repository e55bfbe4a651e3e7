//! File-backed cache storage.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::fs;
use tracing::{debug, warn};

const SOURCE: &str = "cache::store";

/// Persists one text blob per cache key.
///
/// All operations are best-effort: failures are logged and reported through
/// the return value, never raised. Concurrent writers to the same key race
/// with last-write-wins; each write lands through a rename so readers never
/// observe a partially written file.
#[derive(Debug)]
pub struct FileCache {
    base_dir: PathBuf,
    write_seq: AtomicU64,
}

impl FileCache {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Read the blob stored under `key`.
    ///
    /// Returns `None` when the entry is missing or cannot be read as UTF-8.
    pub async fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(target = SOURCE, key, "cache miss");
                None
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    key,
                    path = %path.display(),
                    error = %err,
                    "failed to read cache entry"
                );
                None
            }
        }
    }

    /// Store `value` under `key`, creating intermediate directories.
    ///
    /// Returns `false` when the entry could not be persisted.
    pub async fn put(&self, key: &str, value: &str) -> bool {
        let Some(path) = self.entry_path(key) else {
            return false;
        };

        if let Some(parent) = path.parent()
            && let Err(err) = fs::create_dir_all(parent).await
        {
            warn!(
                target = SOURCE,
                key,
                directory = %parent.display(),
                error = %err,
                "failed to create cache directory"
            );
            return false;
        }

        let staging = self.staging_path(&path);
        if let Err(err) = fs::write(&staging, value).await {
            warn!(
                target = SOURCE,
                key,
                path = %staging.display(),
                error = %err,
                "failed to write cache entry"
            );
            let _ = fs::remove_file(&staging).await;
            return false;
        }

        match fs::rename(&staging, &path).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    key,
                    path = %path.display(),
                    error = %err,
                    "failed to move cache entry into place"
                );
                let _ = fs::remove_file(&staging).await;
                false
            }
        }
    }

    /// Remove the entry stored under `key`. A missing entry is not an error.
    pub async fn invalidate(&self, key: &str) {
        let Some(path) = self.entry_path(key) else {
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => debug!(target = SOURCE, key, "cache entry removed"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                target = SOURCE,
                key,
                path = %path.display(),
                error = %err,
                "failed to remove cache entry"
            ),
        }
    }

    /// Map a cache key onto a path below the base directory.
    ///
    /// Keys are used verbatim; `/` inside a key creates nested directories.
    /// Keys that would escape the base directory (`..`, absolute paths) or
    /// that name no file at all are refused.
    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        let mut path = self.base_dir.clone();
        let mut pushed = false;
        for component in Path::new(key).components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    pushed = true;
                }
                Component::CurDir => {}
                _ => {
                    warn!(target = SOURCE, key, "refusing cache key outside base directory");
                    return None;
                }
            }
        }
        if !pushed || key.ends_with('/') {
            warn!(target = SOURCE, key, "refusing cache key without a file name");
            return None;
        }
        Some(path)
    }

    fn staging_path(&self, path: &Path) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
    }
}

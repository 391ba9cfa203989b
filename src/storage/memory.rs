//! In-memory storage, used for dry runs and tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{compile_pattern, Storage};

#[derive(Debug, Default)]
struct Inner {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

/// Storage that keeps everything in a map
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back a stored file
    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    /// Number of stored files, across all directories
    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    /// Check whether a directory was created
    pub fn has_directory(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned map is still consistent: every mutation is a single insert.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ensure_directory(&self, path: &Path) -> Result<()> {
        let mut inner = self.lock();
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                inner.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.dirs.contains(parent) {
                anyhow::bail!("Directory does not exist: {}", parent.display());
            }
        }
        inner.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    async fn list_files(&self, path: &Path, pattern: &str) -> Result<Vec<String>> {
        let Some(pattern) = compile_pattern(pattern) else {
            return Ok(Vec::new());
        };

        let inner = self.lock();
        let names = inner
            .files
            .keys()
            .filter(|file| file.parent() == Some(path))
            .filter_map(|file| file.file_name().and_then(|n| n.to_str()))
            .filter(|name| pattern.matches(name))
            .map(str::to_string)
            .collect();

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let storage = MemoryStorage::new();
        let job = Path::new("outputs/job-1");

        storage.ensure_directory(job).await.unwrap();
        assert!(storage.has_directory(Path::new("outputs")));

        storage.write_file(&job.join("x.png"), b"img").await.unwrap();
        assert_eq!(storage.read(&job.join("x.png")), Some(b"img".to_vec()));
        assert_eq!(storage.list_files(job, "*.png").await.unwrap(), vec!["x.png"]);
        assert!(storage.list_files(job, "*.jpg").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_requires_directory() {
        let storage = MemoryStorage::new();
        let result = storage.write_file(Path::new("job/x.png"), b"img").await;
        assert!(result.is_err());
        assert_eq!(storage.file_count(), 0);
    }
}

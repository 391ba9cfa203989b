//! Filesystem storage rooted at the configured output directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::{compile_pattern, Storage};

/// Storage backed by the local filesystem
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Root directory; every path is resolved against it
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn ensure_directory(&self, path: &Path) -> Result<()> {
        let dir = self.resolve(path);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))
    }

    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let file = self.resolve(path);
        fs::write(&file, bytes)
            .await
            .with_context(|| format!("Failed to write file: {}", file.display()))
    }

    async fn list_files(&self, path: &Path, pattern: &str) -> Result<Vec<String>> {
        let dir = self.resolve(path);
        let mut names = Vec::new();

        if !dir.exists() {
            return Ok(names);
        }

        let Some(pattern) = compile_pattern(pattern) else {
            return Ok(names);
        };

        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if pattern.matches(name) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_list() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path());
        let job = Path::new("job-1");

        storage.ensure_directory(job).await.unwrap();
        storage
            .write_file(&job.join("b_flat.png"), b"b")
            .await
            .unwrap();
        storage
            .write_file(&job.join("a_flat.png"), b"a")
            .await
            .unwrap();
        storage
            .write_file(&job.join("progress.jsonl"), b"{}")
            .await
            .unwrap();

        let images = storage.list_files(job, "*.png").await.unwrap();
        assert_eq!(images, vec!["a_flat.png", "b_flat.png"]);

        let on_disk = std::fs::read(temp.path().join("job-1/a_flat.png")).unwrap();
        assert_eq!(on_disk, b"a");
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path());

        let files = storage.list_files(Path::new("nope"), "*").await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_write_without_directory_fails() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path());

        let result = storage
            .write_file(Path::new("missing/dir/file.png"), b"x")
            .await;
        assert!(result.is_err());
    }
}

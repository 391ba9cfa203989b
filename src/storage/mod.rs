//! Storage for generated artifacts.
//!
//! The pipeline depends only on the [`Storage`] trait. Paths handed to a
//! storage are relative to its root; each run writes inside its own job
//! folder so concurrent runs never collide.

pub mod local;
pub mod memory;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use glob::Pattern;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Minimal file-storage abstraction used by the pipeline
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create a directory (and its parents) if missing
    async fn ensure_directory(&self, path: &Path) -> Result<()>;

    /// Write a whole file, replacing any previous content
    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// List file names directly under `path` matching a glob `pattern`,
    /// sorted by name
    async fn list_files(&self, path: &Path, pattern: &str) -> Result<Vec<String>>;
}

/// Compile a file-name pattern; an invalid pattern matches nothing
pub(crate) fn compile_pattern(pattern: &str) -> Option<Pattern> {
    Pattern::new(pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        let pattern = compile_pattern("*_flat_*.png").unwrap();
        assert!(pattern.matches("medaille_flat_prop1_20261018.png"));
        assert!(!pattern.matches("medaille_threeQuarter_prop1_20261018.png"));
        assert!(compile_pattern("[").is_none());
    }
}

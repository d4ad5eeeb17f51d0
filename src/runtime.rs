use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // File System
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    #[tracing::instrument(skip(self))]
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path)
            .with_context(|| format!("Failed to canonicalize {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // test_log wires the instrumented spans into the test output
    #[test_log::test]
    fn test_read_to_string_missing_file_has_context() {
        let runtime = RealRuntime;
        let err = runtime
            .read_to_string(Path::new("/nonexistent/reqcheck-test"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test_log::test]
    fn test_exists() {
        let runtime = RealRuntime;
        assert!(!runtime.exists(Path::new("/nonexistent/reqcheck-test")));
    }

    #[test_log::test]
    fn test_canonicalize_missing_path_has_context() {
        let runtime = RealRuntime;
        let err = runtime
            .canonicalize(Path::new("/nonexistent/reqcheck-test"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to canonicalize"));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//! Source acquisition capability: obtaining a working copy to heal

use crate::{HealerError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Handle to an exclusively-owned working copy.
///
/// One working copy belongs to exactly one in-flight run; callers must
/// never share a copy between concurrent runs.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    root: PathBuf,
}

impl WorkingCopy {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Capability consumed from the environment to materialize a repository.
///
/// Clone/download mechanics live behind this seam; any failure surfaces
/// as `HealerError::AcquireFailed`, the one error kind that aborts a run
/// before its first iteration.
pub trait SourceAcquirer {
    fn materialize(&self, repo: &str, token: Option<&str>) -> Result<WorkingCopy>;
}

/// Acquirer for repositories already present on the local filesystem.
pub struct LocalAcquirer;

impl SourceAcquirer for LocalAcquirer {
    fn materialize(&self, repo: &str, _token: Option<&str>) -> Result<WorkingCopy> {
        let root = PathBuf::from(repo);

        if !root.is_dir() {
            return Err(HealerError::AcquireFailed(format!(
                "{} is not an accessible directory",
                root.display()
            )));
        }

        let has_content = fs::read_dir(&root)
            .map_err(|e| HealerError::AcquireFailed(format!("{}: {}", root.display(), e)))?
            .filter_map(|entry| entry.ok())
            .any(|entry| !entry.file_name().to_string_lossy().starts_with('.'));
        if !has_content {
            return Err(HealerError::AcquireFailed(format!(
                "repository at {} is empty",
                root.display()
            )));
        }

        info!("Acquired working copy at {}", root.display());
        Ok(WorkingCopy::new(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_existing_repo() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.py"), "value = 1\n").unwrap();
        let copy = LocalAcquirer
            .materialize(dir.path().to_str().unwrap(), None)
            .unwrap();
        assert_eq!(copy.root(), dir.path());
    }

    #[test]
    fn test_missing_path_is_acquire_failed() {
        let err = LocalAcquirer
            .materialize("/nonexistent/repo/path", None)
            .unwrap_err();
        assert!(matches!(err, HealerError::AcquireFailed(_)));
    }

    #[test]
    fn test_empty_repo_is_acquire_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalAcquirer
            .materialize(dir.path().to_str().unwrap(), None)
            .unwrap_err();
        assert!(matches!(err, HealerError::AcquireFailed(_)));
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// On-disk scratch layout for one run: a thumbnails directory for the cache
/// and a marker file the overlay writes its pid into. The root is an explicit
/// value (CLI or config override, `<tmp>/anipick` by default) so nothing in
/// the pipeline relies on a hardcoded path.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn create(root: PathBuf) -> Result<Self> {
        let workspace = Self { root };
        fs::create_dir_all(workspace.thumbs_dir()).with_context(|| {
            format!(
                "failed to create scratch directory {}",
                workspace.thumbs_dir().display()
            )
        })?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn thumbs_dir(&self) -> PathBuf {
        self.root.join("thumbnails")
    }

    pub fn overlay_pid_file(&self) -> PathBuf {
        self.root.join(".anipick")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_builds_the_thumbnail_directory() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path().join("scratch")).unwrap();
        assert!(workspace.thumbs_dir().is_dir());
        assert_eq!(workspace.root(), dir.path().join("scratch"));
    }

    #[test]
    fn pid_file_lives_under_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path().to_path_buf()).unwrap();
        assert_eq!(workspace.overlay_pid_file(), dir.path().join(".anipick"));
    }
}

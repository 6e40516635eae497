//! Workspace staging
//!
//! Writes the request's in-memory files into a fresh, uniquely named
//! directory. The directory is removed when the [`Workspace`] is dropped,
//! unless it was staged with `keep` set.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::common::utils::enclosed_path;
use crate::error::JobError;
use crate::jobs::JobFile;

const WORKSPACE_PREFIX: &str = "code-runner-";

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    /// Absolute paths of the staged files, in request order
    files: Vec<PathBuf>,
    /// Removes the directory on drop; `None` once persisted
    _dir: Option<TempDir>,
}

impl Workspace {
    /// Stage `files` under `parent` (system temp dir when `None`)
    pub fn stage(files: &[JobFile], parent: Option<&Path>, keep: bool) -> Result<Self, JobError> {
        // Reject bad names before anything touches the disk
        if let Some(file) = files
            .iter()
            .find(|file| enclosed_path(Path::new(""), &file.name).is_none())
        {
            return Err(JobError::InvalidFileName(file.name.clone()));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        let root = dir.path().to_path_buf();

        let mut paths = Vec::with_capacity(files.len());
        for file in files {
            let path = enclosed_path(&root, &file.name)
                .ok_or_else(|| JobError::InvalidFileName(file.name.clone()))?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &file.content)?;
            paths.push(path);
        }

        debug!("Staged {} file(s) in {:?}", paths.len(), root);

        let dir = if keep {
            let kept = dir.keep();
            info!("Keeping workspace {:?}", kept);
            None
        } else {
            Some(dir)
        };

        Ok(Self {
            root,
            files: paths,
            _dir: dir,
        })
    }

    #[allow(dead_code)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Directory of the first file; builds and raw commands run here
    pub fn work_dir(&self) -> PathBuf {
        crate::runner::work_dir_of(&self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content: &str) -> JobFile {
        JobFile {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_stage_preserves_order_and_nesting() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::stage(
            &[
                file("src/main.c", "int main() {}"),
                file("include/util.h", "#pragma once"),
                file("README", "docs"),
            ],
            Some(parent.path()),
            false,
        )
        .unwrap();

        let root = workspace.root().to_path_buf();
        assert!(root.starts_with(parent.path()));
        assert!(root
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKSPACE_PREFIX));
        assert_eq!(
            workspace.files(),
            &[
                root.join("src/main.c"),
                root.join("include/util.h"),
                root.join("README"),
            ]
        );
        assert_eq!(
            std::fs::read_to_string(root.join("include/util.h")).unwrap(),
            "#pragma once"
        );
        assert_eq!(workspace.work_dir(), root.join("src"));
    }

    #[test]
    fn test_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let workspace =
            Workspace::stage(&[file("main.py", "print(1)")], Some(parent.path()), false).unwrap();
        let root = workspace.root().to_path_buf();
        assert!(root.exists());

        drop(workspace);
        assert!(!root.exists());
    }

    #[test]
    fn test_keep_persists_directory() {
        let parent = tempfile::tempdir().unwrap();
        let workspace =
            Workspace::stage(&[file("main.py", "print(1)")], Some(parent.path()), true).unwrap();
        let root = workspace.root().to_path_buf();

        drop(workspace);
        assert!(root.join("main.py").exists());
    }

    #[test]
    fn test_workspaces_are_unique() {
        let parent = tempfile::tempdir().unwrap();
        let files = [file("main.c", "")];
        let first = Workspace::stage(&files, Some(parent.path()), false).unwrap();
        let second = Workspace::stage(&files, Some(parent.path()), false).unwrap();
        assert_ne!(first.root(), second.root());
    }

    #[test]
    fn test_escaping_name_rejected_before_staging() {
        let parent = tempfile::tempdir().unwrap();
        let err = Workspace::stage(
            &[file("main.c", ""), file("../escape.c", "")],
            Some(parent.path()),
            false,
        )
        .unwrap_err();

        assert!(matches!(err, JobError::InvalidFileName(name) if name == "../escape.c"));
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_absolute_name_rejected() {
        let err = Workspace::stage(&[file("/etc/passwd", "")], None, false).unwrap_err();
        assert!(matches!(err, JobError::InvalidFileName(_)));
    }
}

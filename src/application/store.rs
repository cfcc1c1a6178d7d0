//! File-system discovery of project directories.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to enumerate projects root `{}`", .root.display())]
    Enumerate {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read-only view over the directory that holds one sub-directory per project.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
    definition_file: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>, definition_file: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            definition_file: definition_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn definition_file(&self) -> &Path {
        &self.definition_file
    }

    /// List the names of valid projects under the root, sorted lexicographically.
    ///
    /// A missing root yields an empty list. Entries that cannot be inspected are
    /// skipped; failing to open or read the root itself is reported.
    pub async fn list_candidates(&self) -> Result<Vec<String>, StoreError> {
        if let Err(err) = fs::metadata(&self.root).await {
            if err.kind() == ErrorKind::NotFound {
                return Ok(Vec::new());
            }
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|source| StoreError::Enumerate {
                root: self.root.clone(),
                source,
            })?;

        let mut projects = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Enumerate {
                        root: self.root.clone(),
                        source,
                    });
                }
            };

            let Ok(name) = entry.file_name().into_string() else {
                debug!(
                    target = "application::store",
                    entry = ?entry.file_name(),
                    "skipping entry with non UTF-8 name"
                );
                continue;
            };

            if self.is_project(&name).await {
                projects.push(name);
            }
        }

        projects.sort();
        Ok(projects)
    }

    /// Whether `<root>/<name>` is a directory holding the definition file.
    pub async fn is_project(&self, name: &str) -> bool {
        let directory = self.root.join(name);
        match fs::metadata(&directory).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return false,
            Err(err) => {
                debug!(
                    target = "application::store",
                    path = %directory.display(),
                    error = %err,
                    "skipping unreadable project candidate"
                );
                return false;
            }
        }

        let definition = directory.join(&self.definition_file);
        match fs::metadata(&definition).await {
            Ok(metadata) => metadata.is_file(),
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    debug!(
                        target = "application::store",
                        path = %definition.display(),
                        error = %err,
                        "skipping project with unreadable definition"
                    );
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs as std_fs;

    use tempfile::TempDir;

    use super::*;
    use crate::domain::project::DEFAULT_DEFINITION_FILE;

    fn write_project(root: &Path, name: &str) {
        let src = root.join(name).join("src");
        std_fs::create_dir_all(&src).expect("create project dir");
        std_fs::write(src.join("project.ts"), "export default {};\n").expect("write definition");
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let store = ProjectStore::new(dir.path().join("absent"), DEFAULT_DEFINITION_FILE);
        assert!(store.list_candidates().await.expect("listing").is_empty());
    }

    #[tokio::test]
    async fn lists_only_directories_with_definition() {
        let dir = TempDir::new().expect("temp dir");
        write_project(dir.path(), "demo");
        write_project(dir.path(), "default");
        std_fs::create_dir_all(dir.path().join("empty/src")).expect("create empty project");
        std_fs::create_dir_all(dir.path().join("assets")).expect("create assets dir");
        std_fs::write(dir.path().join("README.md"), "notes").expect("write stray file");

        let store = ProjectStore::new(dir.path(), DEFAULT_DEFINITION_FILE);
        let projects = store.list_candidates().await.expect("listing");
        assert_eq!(projects, vec!["default".to_string(), "demo".to_string()]);
    }

    #[tokio::test]
    async fn definition_must_be_a_file() {
        let dir = TempDir::new().expect("temp dir");
        std_fs::create_dir_all(dir.path().join("odd/src/project.ts")).expect("create dir");

        let store = ProjectStore::new(dir.path(), DEFAULT_DEFINITION_FILE);
        assert!(!store.is_project("odd").await);
        assert!(store.list_candidates().await.expect("listing").is_empty());
    }

    #[tokio::test]
    async fn listing_is_sorted_and_stable() {
        let dir = TempDir::new().expect("temp dir");
        for name in ["zeta", "alpha", "Mid", "beta"] {
            write_project(dir.path(), name);
        }

        let store = ProjectStore::new(dir.path(), DEFAULT_DEFINITION_FILE);
        let first = store.list_candidates().await.expect("listing");
        let second = store.list_candidates().await.expect("listing");
        assert_eq!(first, vec!["Mid", "alpha", "beta", "zeta"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn honours_custom_definition_file() {
        let dir = TempDir::new().expect("temp dir");
        write_project(dir.path(), "ts-project");
        std_fs::create_dir_all(dir.path().join("rs-project")).expect("create dir");
        std_fs::write(dir.path().join("rs-project/scene.json"), "{}").expect("write manifest");

        let store = ProjectStore::new(dir.path(), "scene.json");
        let projects = store.list_candidates().await.expect("listing");
        assert_eq!(projects, vec!["rs-project".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_entries_are_skipped() {
        use std::os::unix::fs::{PermissionsExt, symlink};

        let dir = TempDir::new().expect("temp dir");
        write_project(dir.path(), "demo");
        symlink(dir.path().join("vanished"), dir.path().join("dangling"))
            .expect("create dangling symlink");
        symlink(dir.path().join("demo/src/project.ts"), dir.path().join("file-link"))
            .expect("create file symlink");
        let locked = dir.path().join("locked");
        std_fs::create_dir_all(locked.join("src")).expect("create locked project");
        std_fs::set_permissions(&locked, std_fs::Permissions::from_mode(0o000))
            .expect("lock directory");

        let store = ProjectStore::new(dir.path(), DEFAULT_DEFINITION_FILE);
        let listing = store.list_candidates().await;

        std_fs::set_permissions(&locked, std_fs::Permissions::from_mode(0o755))
            .expect("unlock directory");
        assert_eq!(listing.expect("listing"), vec!["demo".to_string()]);
    }

    #[tokio::test]
    async fn root_that_is_a_file_cannot_be_enumerated() {
        let dir = TempDir::new().expect("temp dir");
        let file_root = dir.path().join("projects");
        std_fs::write(&file_root, "not a directory").expect("write file");

        let store = ProjectStore::new(&file_root, DEFAULT_DEFINITION_FILE);
        let err = store.list_candidates().await.expect_err("enumeration fails");
        assert!(matches!(err, StoreError::Enumerate { .. }));
    }
}

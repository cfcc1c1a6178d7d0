//! Download collaborator serving rendered files from the output directory.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::application::engine::{Artifact, ArtifactError, ArtifactStore};

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `name` to a file directly inside the output directory.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.root.join(relative)),
            _ => None,
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn fetch(&self, name: &str) -> Result<Artifact, ArtifactError> {
        let not_found = || ArtifactError::NotFound {
            name: name.to_string(),
        };
        let path = self.resolve(name).ok_or_else(not_found)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Artifact {
                name: name.to_string(),
                bytes: Bytes::from(data),
            }),
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                Err(not_found())
            }
            Err(err) => Err(ArtifactError::Io(err)),
        }
    }
}

//! Project catalog: discovered projects plus the configured default.

use metrics::counter;
use thiserror::Error;

use crate::{
    application::{
        defaults::resolve_default,
        store::{ProjectStore, StoreError},
    },
    config::ProjectsSettings,
    domain::project::CatalogSnapshot,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("project catalog unavailable")]
    Unavailable {
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone)]
pub struct ProjectCatalog {
    store: ProjectStore,
    project_file: Option<String>,
}

impl ProjectCatalog {
    pub fn new(settings: &ProjectsSettings) -> Self {
        Self::from_parts(
            ProjectStore::new(&settings.root, &settings.definition_file),
            settings.project_file.clone(),
        )
    }

    pub fn from_parts(store: ProjectStore, project_file: Option<String>) -> Self {
        Self {
            store,
            project_file,
        }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Name reported as default, whether or not such a project exists.
    pub fn default_project(&self) -> String {
        resolve_default(self.project_file.as_deref())
    }

    /// Build a fresh snapshot from the current state of the projects root.
    pub async fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        let projects = match self.store.list_candidates().await {
            Ok(projects) => projects,
            Err(source) => {
                counter!("clapboard_catalog_failures_total").increment(1);
                return Err(CatalogError::Unavailable { source });
            }
        };

        Ok(CatalogSnapshot::new(projects, self.default_project()))
    }
}

//! Resolve a requested project and forward the render to the collaborator.

use std::{path::PathBuf, sync::Arc};

use metrics::counter;
use thiserror::Error;
use tokio::fs::File;
use tracing::{debug, info};

use crate::{
    application::engine::{RenderBody, RenderEngine, RenderError, RenderJob, RenderReply},
    config::ProjectsSettings,
    domain::project::{ProjectDescriptor, ProjectName},
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("project `{name}` not found")]
    ProjectNotFound { name: String },
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Clone)]
pub struct RenderDispatcher {
    root: PathBuf,
    definition_file: PathBuf,
    engine: Arc<dyn RenderEngine>,
}

impl RenderDispatcher {
    pub fn new(settings: &ProjectsSettings, engine: Arc<dyn RenderEngine>) -> Self {
        Self {
            root: settings.root.clone(),
            definition_file: settings.definition_file.clone(),
            engine,
        }
    }

    /// Resolve `name` to a descriptor whose definition file exists right now.
    ///
    /// The definition file is opened rather than stat-ed; any failure to open it
    /// is reported as not found. The file may still disappear before the
    /// collaborator reads it, which the collaborator must handle on its own.
    pub async fn resolve(&self, name: &str) -> Result<ProjectDescriptor, DispatchError> {
        let not_found = || DispatchError::ProjectNotFound {
            name: name.to_string(),
        };

        let project = ProjectName::parse(name).map_err(|err| {
            debug!(
                target = "application::dispatch",
                project = name,
                error = %err,
                "rejecting project name"
            );
            not_found()
        })?;
        let descriptor = ProjectDescriptor::locate(&self.root, &self.definition_file, project);

        let file = File::open(&descriptor.definition_path).await.map_err(|err| {
            debug!(
                target = "application::dispatch",
                project = name,
                path = %descriptor.definition_path.display(),
                error = %err,
                "definition file unavailable"
            );
            not_found()
        })?;
        let is_file = file
            .metadata()
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(not_found());
        }

        Ok(descriptor)
    }

    /// Dispatch a render for `project`, or for the collaborator's default when `None`.
    pub async fn dispatch(
        &self,
        project: Option<&str>,
        body: RenderBody,
    ) -> Result<RenderReply, DispatchError> {
        let job = match project {
            Some(name) => {
                let descriptor = match self.resolve(name).await {
                    Ok(descriptor) => descriptor,
                    Err(err) => {
                        counter!("clapboard_render_not_found_total").increment(1);
                        return Err(err);
                    }
                };
                counter!("clapboard_render_dispatch_total", "mode" => "named").increment(1);
                info!(
                    target = "application::dispatch",
                    project = descriptor.name.as_str(),
                    definition = %descriptor.definition_path.display(),
                    "dispatching project render"
                );
                RenderJob::for_project(body, &descriptor)
            }
            None => {
                counter!("clapboard_render_dispatch_total", "mode" => "default").increment(1);
                info!(
                    target = "application::dispatch",
                    "dispatching default render"
                );
                RenderJob::new(body)
            }
        };

        Ok(self.engine.render(job).await?)
    }
}

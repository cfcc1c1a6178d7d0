//! Ports to the external render and download collaborators.

use std::io;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::project::ProjectDescriptor;

/// JSON object sent by clients when requesting a render.
pub type RenderBody = Map<String, Value>;

pub const PROJECT_FILE_KEY: &str = "projectFile";
pub const PROJECT_NAME_KEY: &str = "projectName";
pub const CALLBACK_URL_KEY: &str = "callbackUrl";

/// A render request as handed to the render collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    body: RenderBody,
}

impl RenderJob {
    /// A job whose project is left to the collaborator's own defaulting.
    pub fn new(body: RenderBody) -> Self {
        Self { body }
    }

    /// A job for a resolved project; the body gains `projectFile` and `projectName`.
    pub fn for_project(mut body: RenderBody, project: &ProjectDescriptor) -> Self {
        body.insert(
            PROJECT_FILE_KEY.to_string(),
            Value::String(project.definition_path.to_string_lossy().into_owned()),
        );
        body.insert(
            PROJECT_NAME_KEY.to_string(),
            Value::String(project.name.as_str().to_string()),
        );
        Self { body }
    }

    pub fn body(&self) -> &RenderBody {
        &self.body
    }

    pub fn into_body(self) -> RenderBody {
        self.body
    }

    pub fn project_file(&self) -> Option<&str> {
        self.string_field(PROJECT_FILE_KEY)
    }

    pub fn project_name(&self) -> Option<&str> {
        self.string_field(PROJECT_NAME_KEY)
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.string_field(CALLBACK_URL_KEY)
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}

/// Status and JSON body produced by the render collaborator, relayed verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReply {
    pub status: StatusCode,
    pub body: Value,
}

impl RenderReply {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start renderer `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("renderer i/o failed")]
    Io(#[from] io::Error),
    #[error("invalid callback url `{url}`: {reason}")]
    InvalidCallback { url: String, reason: String },
}

#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn render(&self, job: RenderJob) -> Result<RenderReply, RenderError>;
}

/// A previously rendered file, fully buffered.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact `{name}` not found")]
    NotFound { name: String },
    #[error("failed to read artifact")]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Artifact, ArtifactError>;
}

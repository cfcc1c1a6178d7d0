use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    application::{
        catalog::CatalogError,
        dispatch::DispatchError,
        engine::{ArtifactError, RenderError},
        scaffold::ScaffoldError,
    },
    config::LoadError,
    infra::error::InfraError,
};

/// Diagnostic attached to error responses for the response logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// JSON shape of every error produced by the gateway itself.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: String,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn public_message(&self) -> &str {
        &self.public_message
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: self.public_message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<CatalogError> for HttpError {
    fn from(error: CatalogError) -> Self {
        HttpError::from_error(
            "infra::http::catalog_error_to_http_error",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error listando proyectos",
            &error,
        )
    }
}

impl From<DispatchError> for HttpError {
    fn from(error: DispatchError) -> Self {
        const SOURCE: &str = "infra::http::dispatch_error_to_http_error";
        match error {
            DispatchError::ProjectNotFound { name } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                format!("Proyecto \"{name}\" no encontrado"),
                format!("definition file for project `{name}` is missing"),
            ),
            DispatchError::Render(err @ RenderError::InvalidCallback { .. }) => {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::BAD_REQUEST,
                    "URL de callback inválida",
                    &err,
                )
            }
            DispatchError::Render(err) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error renderizando proyecto",
                &err,
            ),
        }
    }
}

impl From<ArtifactError> for HttpError {
    fn from(error: ArtifactError) -> Self {
        const SOURCE: &str = "infra::http::artifact_error_to_http_error";
        match error {
            ArtifactError::NotFound { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Archivo no encontrado",
                &error,
            ),
            ArtifactError::Io(_) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error descargando archivo",
                &error,
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Scaffold(#[from] ScaffoldError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn not_found_names_the_project() {
        let error = HttpError::from(DispatchError::ProjectNotFound {
            name: "ghost".to_string(),
        });
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.public_message(), "Proyecto \"ghost\" no encontrado");
    }

    #[test]
    fn invalid_callback_is_a_client_error() {
        let error = HttpError::from(DispatchError::Render(RenderError::InvalidCallback {
            url: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        }));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn report_collects_error_chain() {
        let error = CatalogError::Unavailable {
            source: crate::application::store::StoreError::Enumerate {
                root: PathBuf::from("projects"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
        };
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(report.messages.len(), 3);
        assert_eq!(report.messages[0], "project catalog unavailable");
        assert!(report.messages[1].contains("projects"));
    }

    #[test]
    fn error_response_carries_report() {
        let response = HttpError::new(
            "test",
            StatusCode::NOT_FOUND,
            "Archivo no encontrado",
            "missing",
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["missing".to_string()]);
    }
}

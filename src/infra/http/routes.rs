use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{
    application::{
        engine::{Artifact, RenderBody, RenderReply},
        error::HttpError,
    },
    domain::project::CatalogSnapshot,
};

use super::AppState;

const INVALID_BODY_MESSAGE: &str = "Cuerpo de la petición inválido";

pub(super) async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<CatalogSnapshot>, HttpError> {
    let snapshot = state.catalog.snapshot().await?;
    Ok(Json(snapshot))
}

pub(super) async fn render_default(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, HttpError> {
    let body = parse_render_body(&body)?;
    let reply = state.dispatcher.dispatch(None, body).await?;
    Ok(reply_response(reply))
}

pub(super) async fn render_project(
    State(state): State<AppState>,
    Path(project_name): Path<String>,
    body: Bytes,
) -> Result<Response, HttpError> {
    let body = parse_render_body(&body)?;
    let reply = state
        .dispatcher
        .dispatch(Some(project_name.as_str()), body)
        .await?;
    Ok(reply_response(reply))
}

pub(super) async fn download(
    State(state): State<AppState>,
    Path(project_name): Path<String>,
) -> Result<Response, HttpError> {
    let artifact = state.artifacts.fetch(&project_name).await?;
    Ok(artifact_response(artifact))
}

/// An empty body stands for `{}`; anything else must be a JSON object.
fn parse_render_body(raw: &[u8]) -> Result<RenderBody, HttpError> {
    const SOURCE: &str = "infra::http::parse_render_body";

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(RenderBody::new());
    }

    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            INVALID_BODY_MESSAGE,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
        Err(err) => Err(HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            INVALID_BODY_MESSAGE,
            &err,
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn reply_response(reply: RenderReply) -> Response {
    (reply.status, Json(reply.body)).into_response()
}

fn artifact_response(artifact: Artifact) -> Response {
    let length = artifact.bytes.len();
    let mut response = Response::new(Body::from(artifact.bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(&artifact.name).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact.name))
    {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    response
}

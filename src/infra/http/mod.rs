mod middleware;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::{
    application::{catalog::ProjectCatalog, dispatch::RenderDispatcher, engine::ArtifactStore},
    config::ServerSettings,
};

use middleware::{CorsPolicy, apply_cors, log_responses, set_request_context};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ProjectCatalog>,
    pub dispatcher: Arc<RenderDispatcher>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

pub fn build_router(state: AppState, server: &ServerSettings) -> Router {
    Router::new()
        .route("/projects", get(routes::list_projects))
        .route("/render", post(routes::render_default))
        .route("/render/{project_name}", post(routes::render_project))
        .route("/download/{project_name}", get(routes::download))
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_body_bytes.get()))
        .layer(axum_middleware::from_fn_with_state(
            CorsPolicy::new(&server.cors_allow_origin),
            apply_cors,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

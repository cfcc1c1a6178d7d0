//! Render collaborator backed by an external renderer process.

use std::{
    io::{self, ErrorKind},
    path::PathBuf,
    process::Stdio,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tokio::{fs, io::AsyncWriteExt, process::Command, task::JoinSet, time};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    application::engine::{RenderEngine, RenderError, RenderJob, RenderReply},
    config::RenderSettings,
};

const RENDER_FAILED_MESSAGE: &str = "Error renderizando proyecto";

/// Runs `<program> <args...>` once per job.
///
/// The job body is written to the renderer's stdin as JSON. The renderer
/// receives `PROJECT_FILE`, `RENDER_OUTPUT` and `RENDER_JOB_ID` in its
/// environment and must write the finished video to `RENDER_OUTPUT`.
///
/// Renders requested with a `callbackUrl` run in the background and are
/// tracked until [`CommandRenderEngine::finish_background_jobs`] collects them.
#[derive(Debug, Clone)]
pub struct CommandRenderEngine {
    program: String,
    args: Vec<String>,
    output_dir: PathBuf,
    output_extension: String,
    public_base_url: Option<Url>,
    default_project_file: PathBuf,
    http: reqwest::Client,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl CommandRenderEngine {
    pub fn new(settings: &RenderSettings) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&settings.output_dir)?;
        Ok(Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            output_dir: settings.output_dir.clone(),
            output_extension: settings.output_extension.clone(),
            public_base_url: settings.public_base_url.clone(),
            default_project_file: settings.default_project_file.clone(),
            http: reqwest::Client::new(),
            background: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    /// Wait for background renders until `deadline`, then abort the rest.
    ///
    /// Aborted renders kill their renderer process and never call back.
    /// Returns the number of renders that were abandoned.
    pub async fn finish_background_jobs(&self, deadline: time::Instant) -> usize {
        let mut jobs = std::mem::take(
            &mut *self
                .background
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let pending = jobs.len();
        if pending == 0 {
            return 0;
        }

        info!(
            target = "infra::renderer",
            op = "renderer::shutdown",
            pending,
            "Waiting for background renders"
        );
        let drained = time::timeout_at(deadline, async {
            while jobs.join_next().await.is_some() {}
        })
        .await;
        if drained.is_ok() {
            return 0;
        }

        let abandoned = jobs.len();
        warn!(
            target = "infra::renderer",
            op = "renderer::shutdown",
            abandoned,
            "Abandoning background renders"
        );
        jobs.abort_all();
        while jobs.join_next().await.is_some() {}
        abandoned
    }

    fn download_link(&self, file_name: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!(
                "{}/download/{file_name}",
                base.as_str().trim_end_matches('/')
            ),
            None => format!("/download/{file_name}"),
        }
    }

    async fn run(&self, job_id: &str, job: &RenderJob) -> Result<RenderReply, RenderError> {
        let started_at = Instant::now();
        let file_name = format!("{job_id}.{}", self.output_extension);
        let output_path = self.output_dir.join(&file_name);
        let project_file = job
            .project_file()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_project_file.clone());
        let payload = serde_json::to_vec(job.body()).map_err(io::Error::from)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("PROJECT_FILE", &project_file)
            .env("RENDER_OUTPUT", &output_path)
            .env("RENDER_JOB_ID", job_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                warn!(
                    target = "infra::renderer",
                    op = "renderer::spawn",
                    job_id,
                    program = %self.program,
                    error = %source,
                    "Failed to spawn renderer"
                );
                RenderError::Spawn {
                    program: self.program.clone(),
                    source,
                }
            })?;

        // stdin is fed while stderr is drained; the renderer may fill either pipe first.
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&payload).await {
                // The renderer may ignore stdin entirely and exit early.
                Err(err) if err.kind() != ErrorKind::BrokenPipe => Err(err),
                _ => Ok(()),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        if !output.status.success() {
            let exit_code = output.status.code().map(i64::from).unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(
                target = "infra::renderer",
                op = "renderer::run",
                result = "error",
                job_id,
                project_file = %project_file.display(),
                elapsed_ms,
                exit_code,
                stderr = %stderr,
                "Renderer exited with failure"
            );
            return Ok(failure_reply(job_id, stderr));
        }

        let produced = fs::metadata(&output_path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !produced {
            warn!(
                target = "infra::renderer",
                op = "renderer::run",
                result = "missing_output",
                job_id,
                output = %output_path.display(),
                elapsed_ms,
                "Renderer finished without producing output"
            );
            return Ok(failure_reply(
                job_id,
                format!("renderer did not write `{file_name}`"),
            ));
        }

        info!(
            target = "infra::renderer",
            op = "renderer::run",
            result = "success",
            job_id,
            project_file = %project_file.display(),
            output = %output_path.display(),
            elapsed_ms,
            "Render finished"
        );

        Ok(RenderReply::new(
            StatusCode::OK,
            json!({
                "status": "success",
                "jobId": job_id,
                "downloadLink": self.download_link(&file_name),
            }),
        ))
    }

    async fn notify(&self, callback: Url, body: Value) {
        match self.http.post(callback.clone()).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    target = "infra::renderer",
                    op = "renderer::callback",
                    callback = %callback,
                    status = response.status().as_u16(),
                    "Render callback delivered"
                );
            }
            Ok(response) => {
                warn!(
                    target = "infra::renderer",
                    op = "renderer::callback",
                    callback = %callback,
                    status = response.status().as_u16(),
                    "Render callback rejected"
                );
            }
            Err(err) => {
                warn!(
                    target = "infra::renderer",
                    op = "renderer::callback",
                    callback = %callback,
                    error = %err,
                    "Render callback failed"
                );
            }
        }
    }
}

#[async_trait]
impl RenderEngine for CommandRenderEngine {
    async fn render(&self, job: RenderJob) -> Result<RenderReply, RenderError> {
        let job_id = Uuid::new_v4().to_string();
        let callback = job.callback_url().map(parse_callback).transpose()?;

        let Some(callback) = callback else {
            return self.run(&job_id, &job).await;
        };

        let engine = self.clone();
        let background_id = job_id.clone();
        {
            let mut jobs = self
                .background
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            while jobs.try_join_next().is_some() {}
            jobs.spawn(async move {
                let body = match engine.run(&background_id, &job).await {
                    Ok(reply) => reply.body,
                    Err(err) => failure_reply(&background_id, err.to_string()).body,
                };
                engine.notify(callback, body).await;
            });
        }

        Ok(RenderReply::new(
            StatusCode::ACCEPTED,
            json!({ "status": "processing", "jobId": job_id }),
        ))
    }
}

fn failure_reply(job_id: &str, detail: String) -> RenderReply {
    RenderReply::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({
            "status": "error",
            "jobId": job_id,
            "message": RENDER_FAILED_MESSAGE,
            "detail": detail,
        }),
    )
}

fn parse_callback(raw: &str) -> Result<Url, RenderError> {
    let invalid = |reason: String| RenderError::InvalidCallback {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}

//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::{Component, Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use axum::http::HeaderValue;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, NewArgs, ProjectsOverrides, ServeArgs, ServeOverrides};

use crate::domain::project::{DEFAULT_DEFINITION_FILE, FALLBACK_PROJECT, ProjectName};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "clapboard";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_CORS_ALLOW_ORIGIN: &str = "*";
const DEFAULT_PROJECTS_DIR: &str = "./projects";
const DEFAULT_RENDER_PROGRAM: &str = "npx";
const DEFAULT_RENDER_ARGS: [&str; 2] = ["revideo", "render"];
const DEFAULT_RENDER_OUTPUT_DIR: &str = "output";
const DEFAULT_RENDER_OUTPUT_EXTENSION: &str = "mp4";
const DEFAULT_RENDER_PROJECT_FILE: &str = "./src/project.ts";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub projects: ProjectsSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub max_body_bytes: NonZeroUsize,
    pub cors_allow_origin: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Where projects live and how the default project is named.
#[derive(Debug, Clone)]
pub struct ProjectsSettings {
    pub root: PathBuf,
    pub project_file: Option<String>,
    pub definition_file: PathBuf,
    pub template: String,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub program: String,
    pub args: Vec<String>,
    pub output_dir: PathBuf,
    pub output_extension: String,
    pub public_base_url: Option<Url>,
    pub default_project_file: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("CLAPBOARD").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_projects_overrides(&cli.projects);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Projects) | Some(Command::New(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    projects: RawProjectsSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_projects_overrides(&mut self, overrides: &ProjectsOverrides) {
        if let Some(root) = overrides.projects_dir.as_ref() {
            self.projects.root = Some(root.clone());
        }
        if let Some(file) = overrides.project_file.as_ref() {
            self.projects.project_file = Some(file.clone());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(bytes) = overrides.server_max_body_bytes {
            self.server.max_body_bytes = Some(bytes);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(program) = overrides.render_program.as_ref() {
            self.render.program = Some(program.clone());
        }
        if let Some(dir) = overrides.render_output_dir.as_ref() {
            self.render.output_dir = Some(dir.clone());
        }
        if let Some(url) = overrides.render_public_base_url.as_ref() {
            self.render.public_base_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            projects,
            render,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let projects = build_projects_settings(projects)?;
        let render = build_render_settings(render, &projects)?;

        Ok(Self {
            server,
            logging,
            projects,
            render,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    let max_body_value = server.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
    let max_body_bytes = usize::try_from(max_body_value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid(
                "server.max_body_bytes",
                "must be greater than zero and fit in usize",
            )
        })?;

    let cors_allow_origin = server
        .cors_allow_origin
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CORS_ALLOW_ORIGIN.to_string());
    if cors_allow_origin.is_empty() || HeaderValue::from_str(&cors_allow_origin).is_err() {
        return Err(LoadError::invalid(
            "server.cors_allow_origin",
            "must be a non-empty header value",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        max_body_bytes,
        cors_allow_origin,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_projects_settings(projects: RawProjectsSettings) -> Result<ProjectsSettings, LoadError> {
    let root = projects
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECTS_DIR));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("projects.root", "path must not be empty"));
    }

    let project_file = projects.project_file.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let definition_file = projects
        .definition_file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DEFINITION_FILE));
    validate_relative(&definition_file, "projects.definition_file")?;

    let template = projects
        .template
        .unwrap_or_else(|| FALLBACK_PROJECT.to_string());
    ProjectName::parse(&template)
        .map_err(|err| LoadError::invalid("projects.template", err.to_string()))?;

    Ok(ProjectsSettings {
        root,
        project_file,
        definition_file,
        template,
    })
}

fn build_render_settings(
    render: RawRenderSettings,
    projects: &ProjectsSettings,
) -> Result<RenderSettings, LoadError> {
    let program = render
        .program
        .unwrap_or_else(|| DEFAULT_RENDER_PROGRAM.to_string());
    if program.trim().is_empty() {
        return Err(LoadError::invalid(
            "render.program",
            "program must not be empty",
        ));
    }

    let args = render
        .args
        .unwrap_or_else(|| DEFAULT_RENDER_ARGS.iter().map(|arg| arg.to_string()).collect());

    let output_dir = render
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_OUTPUT_DIR));
    if output_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.output_dir",
            "path must not be empty",
        ));
    }

    let output_extension = render
        .output_extension
        .map(|value| value.trim().trim_start_matches('.').to_string())
        .unwrap_or_else(|| DEFAULT_RENDER_OUTPUT_EXTENSION.to_string());
    if output_extension.is_empty()
        || !output_extension
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
    {
        return Err(LoadError::invalid(
            "render.output_extension",
            "must be a non-empty alphanumeric extension",
        ));
    }

    let public_base_url = match render.public_base_url {
        Some(value) if !value.trim().is_empty() => {
            let url = Url::parse(value.trim()).map_err(|err| {
                LoadError::invalid("render.public_base_url", format!("failed to parse: {err}"))
            })?;
            if url.cannot_be_a_base() {
                return Err(LoadError::invalid(
                    "render.public_base_url",
                    "must be an absolute base URL",
                ));
            }
            Some(url)
        }
        _ => None,
    };

    let default_project_file = render
        .default_project_file
        .or_else(|| projects.project_file.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_PROJECT_FILE));

    Ok(RenderSettings {
        program,
        args,
        output_dir,
        output_extension,
        public_base_url,
        default_project_file,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    max_body_bytes: Option<u64>,
    cors_allow_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawProjectsSettings {
    root: Option<PathBuf>,
    project_file: Option<String>,
    definition_file: Option<PathBuf>,
    template: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    program: Option<String>,
    args: Option<Vec<String>>,
    output_dir: Option<PathBuf>,
    output_extension: Option<String>,
    public_base_url: Option<String>,
    default_project_file: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn validate_relative(path: &Path, key: &'static str) -> Result<(), LoadError> {
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    if path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    }) {
        return Err(LoadError::invalid(
            key,
            "path must be relative and stay inside the project directory",
        ));
    }
    Ok(())
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

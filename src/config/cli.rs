use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Clapboard binary.
#[derive(Debug, Parser)]
#[command(name = "clapboard", version, about = "Clapboard render gateway")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CLAPBOARD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub projects: ProjectsOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP gateway.
    Serve(Box<ServeArgs>),
    /// Print the discovered projects and the default project as JSON.
    Projects,
    /// Create a new project from the template project.
    New(NewArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ProjectsOverrides {
    /// Override the directory scanned for projects.
    #[arg(
        long = "projects-dir",
        env = "PROJECTS_DIR",
        value_name = "PATH",
        global = true
    )]
    pub projects_dir: Option<PathBuf>,

    /// Project file whose directory names the default project.
    #[arg(
        long = "project-file",
        env = "PROJECT_FILE",
        value_name = "PATH",
        global = true
    )]
    pub project_file: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the maximum accepted request body size in bytes.
    #[arg(long = "server-max-body-bytes", value_name = "BYTES")]
    pub server_max_body_bytes: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the renderer executable.
    #[arg(long = "render-program", value_name = "PATH")]
    pub render_program: Option<String>,

    /// Override the directory rendered files are written to and served from.
    #[arg(long = "render-output-dir", value_name = "PATH")]
    pub render_output_dir: Option<PathBuf>,

    /// Override the public base URL used in download links.
    #[arg(long = "render-public-base-url", value_name = "URL")]
    pub render_public_base_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct NewArgs {
    /// Name of the project directory to create.
    #[arg(value_name = "NAME")]
    pub name: String,
}

use std::{future::IntoFuture, process, sync::Arc};

use clapboard::{
    application::{
        catalog::ProjectCatalog, dispatch::RenderDispatcher, error::AppError,
        scaffold::ProjectScaffolder,
    },
    config,
    infra::{
        artifacts::FsArtifactStore,
        error::InfraError,
        http::{self, AppState},
        renderer::CommandRenderEngine,
        telemetry,
    },
};
use tokio::{sync::oneshot, time::Instant};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Projects => run_projects(settings).await,
        config::Command::New(args) => run_new(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let engine = Arc::new(CommandRenderEngine::new(&settings.render).map_err(InfraError::from)?);
    let state = AppState {
        catalog: Arc::new(ProjectCatalog::new(&settings.projects)),
        dispatcher: Arc::new(RenderDispatcher::new(
            &settings.projects,
            engine.clone(),
        )),
        artifacts: Arc::new(FsArtifactStore::new(&settings.render.output_dir)),
    };
    let router = http::build_router(state, &settings.server);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "clapboard::serve",
        addr = %settings.server.addr,
        projects_root = %settings.projects.root.display(),
        output_dir = %settings.render.output_dir.display(),
        "Listening"
    );

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let grace = settings.server.graceful_shutdown;
    let (result, deadline) = tokio::select! {
        result = &mut server => (result, Instant::now() + grace),
        _ = signalled_rx => {
            let deadline = Instant::now() + grace;
            (drain(&mut server, deadline).await, deadline)
        }
    };
    engine.finish_background_jobs(deadline).await;

    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

/// Wait for in-flight requests, giving up at `deadline`.
async fn drain<F>(server: &mut F, deadline: Instant) -> std::io::Result<()>
where
    F: std::future::Future<Output = std::io::Result<()>> + Unpin,
{
    info!(target = "clapboard::serve", "Shutting down");
    match tokio::time::timeout_at(deadline, server).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                target = "clapboard::serve",
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "clapboard::serve", error = %err, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(target = "clapboard::serve", error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn run_projects(settings: config::Settings) -> Result<(), AppError> {
    let catalog = ProjectCatalog::new(&settings.projects);
    let snapshot = catalog.snapshot().await?;
    let rendered = serde_json::to_string_pretty(&snapshot)
        .map_err(|err| AppError::unexpected(format!("failed to encode projects: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn run_new(settings: config::Settings, args: config::NewArgs) -> Result<(), AppError> {
    let scaffolder = ProjectScaffolder::new(&settings.projects);
    let report = scaffolder.create(&args.name).await?;

    println!(
        "Created project \"{}\" in {}",
        report.name,
        report.directory.display()
    );
    for path in &report.created {
        println!("  {}", path.display());
    }
    println!();
    println!("Next steps:");
    println!("  cd {} && npm install", report.directory.display());
    println!(
        "  curl -X POST http://{}/render/{}",
        settings.server.addr, report.name
    );
    Ok(())
}

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stemyard_core::{load_config, load_default_config, validate_config, Config, TaskStore};
use stemyard_server::cli::{run_command, Cli, Command};
use stemyard_server::state::{Adapters, AppState};
use stemyard_server::create_router;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = cli.command();
    let (config_path, explicit) = cli.config_path();
    let strict = explicit && matches!(command, Command::Serve);
    let config = resolve_config(&config_path, strict)?;

    match command {
        Command::Serve => serve(config).await,
        other => {
            let state = AppState::from_config(config);
            run_command(other, &state).await
        }
    }
}

/// Loads the config file. A missing file falls back to defaults unless
/// `strict` is set.
fn resolve_config(path: &Path, strict: bool) -> Result<Config> {
    let config = if path.exists() || strict {
        info!("Loading configuration from {}", path.display());
        load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        debug!("No config file at {}, using defaults", path.display());
        load_default_config().context("Failed to load default configuration")?
    };
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting stemyard v{}", VERSION);

    let adapters = Adapters::from_config(&config);
    spawn_tool_check(&adapters);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let sweep_interval = Duration::from_secs(config.tasks.sweep_interval_secs.max(1));
    let state = Arc::new(AppState::new(config, adapters));

    spawn_task_sweeper(Arc::clone(state.tasks()), sweep_interval);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Probes the external tools in the background. A missing tool only
/// disables the operations that need it.
fn spawn_tool_check(adapters: &Adapters) {
    let acquirer = Arc::clone(&adapters.acquirer);
    let separator = Arc::clone(&adapters.separator);
    let transcoder = Arc::clone(&adapters.transcoder);
    tokio::spawn(async move {
        if let Err(e) = acquirer.validate().await {
            warn!(acquirer = acquirer.name(), error = %e, "Acquirer unavailable");
        }
        if let Err(e) = separator.validate().await {
            warn!(separator = separator.name(), error = %e, "Separator unavailable");
        }
        if let Err(e) = transcoder.validate().await {
            warn!(transcoder = transcoder.name(), error = %e, "Transcoder unavailable");
        }
    });
}

fn spawn_task_sweeper(tasks: Arc<dyn TaskStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = tasks.prune();
            if removed > 0 {
                debug!(removed, "Pruned finished tasks");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

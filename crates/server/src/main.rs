use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use depot_service::FileServiceBuilder;

use depot_server::api::{AppState, router};
use depot_server::config::DepotConfig;
use depot_server::error::ServerError;
use depot_server::{blob_factory, index_factory, logging};

/// Depot file store HTTP server.
#[derive(Parser, Debug)]
#[command(name = "depot-server", about = "Standalone HTTP server for Depot")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "depot.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run database migrations for the configured index backend, then exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let (config, config_exists) = DepotConfig::load(&cli.config)?;

    if let Some(Commands::Migrate) = cli.command {
        logging::init_basic();
        index_factory::run_migrations(&config.index).await?;
        return Ok(());
    }

    logging::init(&config.logging);

    if !config_exists {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let blobs = blob_factory::create_blob_store(&config.blob).await?;
    let index = index_factory::create_index(&config.index).await?;

    let files = FileServiceBuilder::new()
        .blobs(blobs)
        .index(index)
        .policy(config.uploads.policy())
        .url_prefix(config.uploads.url_prefix.clone())
        .build()?;

    let mut state = AppState::new(files.clone(), config.uploads.default_uploader.as_str());
    if let Some(limit) = config.server.body_limit {
        state.body_limit = limit;
    }
    info!(
        body_limit = state.body_limit,
        max_file_size = files.policy().max_file_size,
        max_files = files.policy().max_files,
        "upload limits"
    );
    let app = router(state);

    let host = cli.host.as_deref().unwrap_or(&config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(ServerError::Io)?;
    info!(address = %addr, "depot-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Io)?;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    info!(
        timeout_secs = config.server.shutdown_timeout_seconds,
        "closing stores..."
    );
    match tokio::time::timeout(shutdown_timeout, files.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to close stores cleanly"),
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            "shutdown timeout exceeded while closing stores"
        ),
    }

    info!("depot-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}

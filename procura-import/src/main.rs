//! procura-import - bulk import service for procurement spreadsheet exports
//!
//! Listens for import triggers and streams each job's progress as SSE.
//! Default port: 5780

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use procura_common::config::{
    ensure_root_folder, load_toml_config, resolve_root_folder, LoggingConfig, ROOT_FOLDER_ENV,
};
use serde::Deserialize;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use procura_import::config::{ImportConfig, ImportOverrides};
use procura_import::db::SqliteImportStore;
use procura_import::services::HttpWorkbookSource;
use procura_import::AppState;

const DEFAULT_PORT: u16 = 5780;
const CONFIG_FILE_NAME: &str = "procura-import.toml";
const DATABASE_FILE_NAME: &str = "procura.db";

/// Command-line arguments for procura-import
#[derive(Parser, Debug)]
#[command(name = "procura-import")]
#[command(about = "Bulk import service for public procurement spreadsheets")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides TOML)
    #[arg(short, long, env = "PROCURA_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides TOML)
    #[arg(long, env = "PROCURA_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Root folder holding the database and config file
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <root>/procura-import.toml)
    #[arg(short, long, env = "PROCURA_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (default: <root>/procura.db)
    #[arg(long, env = "PROCURA_DATABASE")]
    database: Option<PathBuf>,

    /// Log level filter when RUST_LOG is unset (overrides TOML)
    #[arg(long)]
    log_level: Option<String>,
}

/// `procura-import.toml`
#[derive(Debug, Default, Deserialize)]
struct ServiceToml {
    port: Option<u16>,
    bind_address: Option<String>,
    database_path: Option<PathBuf>,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    import: ImportOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Root folder and TOML are read before the subscriber exists so the TOML
    // log level can take effect.
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV);
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| root_folder.join(CONFIG_FILE_NAME));
    let toml_result = load_toml_config::<ServiceToml>(&config_path);

    let level = args
        .log_level
        .clone()
        .or_else(|| toml_result.as_ref().ok().map(|t| t.logging.level.clone()))
        .unwrap_or_else(|| LoggingConfig::default().level);

    let default_filter = format!("procura_import={level},procura_common={level},tower_http={level}");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting procura-import v{}", env!("CARGO_PKG_VERSION"));

    info!("Root folder: {}", root_folder.display());
    info!("Config file: {}", config_path.display());
    ensure_root_folder(&root_folder).context("Failed to create root folder")?;

    let toml = toml_result.context("Failed to load configuration")?;

    let import_config = ImportConfig::default().with_overrides(&toml.import);
    info!(
        max_rows_per_chunk = import_config.max_rows_per_chunk,
        record_batch_size = import_config.record_batch_size,
        alert_batch_size = import_config.alert_batch_size,
        error_ceiling = import_config.error_ceiling,
        "Import configuration loaded"
    );

    let db_path = args
        .database
        .or(toml.database_path)
        .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME));
    info!("Database: {}", db_path.display());
    let db_pool = procura_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let store = Arc::new(SqliteImportStore::new(db_pool));
    match &import_config.local_file_root {
        Some(root) => info!("Local file references allowed under {}", root.display()),
        None => info!("Local file references disabled"),
    }
    let source = Arc::new(
        HttpWorkbookSource::new(
            import_config.fetch_timeout,
            import_config.local_file_root.clone(),
        )
        .context("Failed to initialize workbook source")?,
    );

    let state = AppState::new(store, source, import_config);
    let app = procura_import::build_router(state).layer(TraceLayer::new_for_http());

    let port = args.port.or(toml.port).unwrap_or(DEFAULT_PORT);
    let bind_address = args
        .bind_address
        .or(toml.bind_address)
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

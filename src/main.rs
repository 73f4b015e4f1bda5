use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ecm_gateway::app::{build_router, AppState};
use ecm_gateway::config::AppConfig;
use ecm_gateway::db::repository::{DocumentStore, SqliteDocumentStore};
use ecm_gateway::storage::client::{S3StorageClient, StorageClient};

#[derive(Parser, Debug)]
#[command(name = "ecm-gateway")]
#[command(about = "REST gateway over an enterprise content store")]
struct Cli {
    /// Path to a configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "ECM_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .init();

    tracing::info!("Starting ECM gateway...");

    // Open the document store
    let sqlite = SqliteDocumentStore::open(&config.store.database_path, config.store.max_connections)?;
    sqlite.init_schema()?;
    let document_store: Arc<dyn DocumentStore> = Arc::new(sqlite);

    tracing::info!("Document store opened at {}", config.store.database_path);

    // Connect to S3
    let storage_client: Arc<dyn StorageClient> =
        Arc::new(S3StorageClient::from_config(&config.storage).await?);

    tracing::info!("S3 storage client initialized (bucket '{}')", config.storage.bucket);

    let state = AppState::new(&config, document_store, storage_client);
    let app = build_router(state, config.server.max_upload_bytes);

    // Start the server
    tracing::info!("Listening on http://{}", config.server.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

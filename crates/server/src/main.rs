use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glbforge_core::{
    create_exporter, load_config, validate_config, AssimpConverter, Compressor,
    ConversionPipeline, DracoCompressor, Exporter, JobWorker, MeshConverter, QueueClient,
    StorageResolver,
};
use glbforge_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("GLBFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Queue database: {:?}", config.queue.database_path);
    info!("Output root: {:?}", config.storage.output_root);

    tokio::fs::create_dir_all(&config.storage.upload_root)
        .await
        .with_context(|| {
            format!(
                "Failed to create upload root {:?}",
                config.storage.upload_root
            )
        })?;
    info!("Upload root: {:?}", config.storage.upload_root);

    // Queue handle; the store opens on first use
    let queue = Arc::new(QueueClient::new(config.queue.clone()));

    // External tool adapters
    let exporter: Arc<dyn Exporter> = create_exporter(&config.exporter);
    let converter: Arc<dyn MeshConverter> =
        Arc::new(AssimpConverter::new(config.converter.clone()));
    let compressor: Arc<dyn Compressor> =
        Arc::new(DracoCompressor::new(config.compressor.clone()));

    // Missing tools only fail the jobs that need them
    if let Err(e) = exporter.validate().await {
        warn!(exporter = exporter.name(), error = %e, "Exporter unavailable");
    } else {
        info!(
            exporter = exporter.name(),
            interchange = exporter.interchange_extension(),
            "Exporter ready"
        );
    }
    if let Err(e) = converter.validate().await {
        warn!(converter = converter.name(), error = %e, "Mesh converter unavailable");
    } else {
        info!(converter = converter.name(), "Mesh converter ready");
    }
    info!(
        compressor = compressor.name(),
        enabled = config.compressor.enabled,
        "Compression step configured"
    );

    let storage = Arc::new(
        StorageResolver::new(config.storage.clone()).context("Failed to set up storage")?,
    );
    info!(mode = storage.kind().as_str(), "Storage resolver initialized");

    let pipeline = Arc::new(ConversionPipeline::new(
        exporter,
        converter,
        compressor,
        Arc::clone(&storage),
    ));

    // Start the job worker
    let worker = Arc::new(JobWorker::new(Arc::clone(&queue), Arc::clone(&pipeline)));
    worker
        .start()
        .await
        .context("Failed to start job worker")?;
    info!(worker_id = worker.worker_id(), "Job worker started");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        queue,
        pipeline,
        Arc::clone(&worker),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    worker.stop().await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

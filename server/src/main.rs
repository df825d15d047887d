use anyhow::{Context, Result};
use log::{info, warn};
use pdfdrop_server::{build_router, storage::DiskStore, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting upload server...");

    let config = ServerConfig::from_env();
    let store = DiskStore::new(&config.upload_dir);
    if store.dir_ready() {
        info!("Storing uploads in {}", store.dir().display());
    } else {
        warn!(
            "Upload directory {} does not exist; uploads will fail until it is created",
            store.dir().display()
        );
    }
    match config.body_limit {
        Some(limit) => info!("Request body limit: {} bytes", limit),
        None => info!("Request body limit: none"),
    }

    let app = build_router(AppState::new(store), config.body_limit);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server is running on http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
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
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
    info!("Shutting down, waiting for in-flight uploads...");
}

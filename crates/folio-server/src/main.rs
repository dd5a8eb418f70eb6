//! Folio project server binary.

use folio_core::storage::FileBackend;
use folio_server::{AppState, ServerConfig, router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let backend = match &config.data_dir {
        Some(dir) => FileBackend::new(dir.clone())?,
        None => FileBackend::default_location()?,
    };
    info!("Storing projects in {}", backend.base_path().display());

    let app = router(AppState::new(Arc::new(backend)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Folio project server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

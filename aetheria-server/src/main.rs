//! Aetheria Server - REST API for the image workspace
//!
//! Exposes aetheria-core over HTTP:
//! - POST /api/v1/images - Upload and record an image
//! - POST /api/v1/images/{id}/enhance - Enhance a stored image
//! - POST /api/v1/images/{id}/variations - Generate stylistic variations
//! - GET  /api/v1/images, /api/v1/gallery - Owner history

use std::net::SocketAddr;
use std::sync::Arc;

use aetheria_core::store::DocumentStore;
use aetheria_core::{
    Capabilities, GenerativeModel, LocalObjectStore, MemoryDocumentStore, ModelProviderConfig,
    ModelProviderFactory,
};
use aetheria_server::{create_router_with_config, AppState, Config, PostgresDocumentStore};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("aetheria_server=info,aetheria_core=info,tower_http=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Hosted model when configured, mock only when explicitly allowed.
fn build_model(config: &Config) -> Result<Arc<dyn GenerativeModel>, BoxError> {
    match ModelProviderFactory::create(ModelProviderConfig::Auto) {
        Ok(model) => Ok(model),
        Err(e) if config.allow_mock_model => {
            tracing::warn!(error = %e, "No model configured, using MOCK model (testing only)");
            Ok(ModelProviderFactory::create_mock())
        }
        Err(e) => Err(format!(
            "model not configured ({}); set GEMINI_API_KEY or ALLOW_MOCK_MODEL=true",
            e
        )
        .into()),
    }
}

async fn build_documents(config: &Config) -> Result<Arc<dyn DocumentStore>, BoxError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresDocumentStore::new(
                url,
                config.database_max_connections,
                config.database_min_connections,
            )
            .await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory document store (not durable)");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing();

    let config = Config::from_env();

    let model = build_model(&config)?;
    let documents = build_documents(&config).await?;
    let objects = Arc::new(LocalObjectStore::new(
        &config.storage_dir,
        &config.public_base_url,
    ));

    let capabilities = Capabilities::new(objects, documents, model);
    tracing::info!(capabilities = ?capabilities, "Capabilities ready");

    let state = AppState::from_capabilities(&capabilities, &config);
    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Aetheria server listening on http://{}", addr);
    tracing::info!("API docs at http://{}/docs", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

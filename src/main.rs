use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use dxr_core::config::{
    data_dir_from_env_value, namespace_from_env_value, store_backend_from_env_value,
};
use dxr_core::{CoreConfig, DiagnosisService, StoreBackend};

/// Main entry point for the DXR server
///
/// Resolves configuration once from the environment, opens the record store and serves the REST
/// API (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `DXR_DATA_DIR`: data directory for the file store (default: "patient_data")
/// - `DXR_STORE`: `file` or `memory` (default: "file")
/// - `DXR_NAMESPACE`: namespace used in commit author e-mails (default: "dxr.dev.1")
/// - `DXR_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the data directory does not exist,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dxr_run=info".parse()?)
                .add_directive("dxr_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = data_dir_from_env_value(std::env::var("DXR_DATA_DIR").ok().as_deref());
    let store_backend = store_backend_from_env_value(std::env::var("DXR_STORE").ok().as_deref())?;
    let namespace = namespace_from_env_value(std::env::var("DXR_NAMESPACE").ok().as_deref())?;
    let rest_addr = std::env::var("DXR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    if store_backend == StoreBackend::File && !data_dir.is_dir() {
        anyhow::bail!("Data directory does not exist: {}", data_dir.display());
    }

    let cfg = Arc::new(CoreConfig::new(data_dir, namespace, store_backend)?);
    let service = DiagnosisService::from_config(cfg.clone())?;

    tracing::info!(
        store = %cfg.store_backend(),
        data_dir = %cfg.data_dir().display(),
        "++ Starting DXR REST on {}",
        rest_addr
    );

    let app = router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

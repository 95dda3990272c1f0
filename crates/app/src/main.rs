mod problem;
mod router;
mod telemetry;

use std::{net::SocketAddr, sync::Arc};

use jobtrack_core::ApplicationStore;
use jobtrack_storage::Database;
use jobtrack_util::{load_env_file, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database.url, config.database.max_connections).await?;
    database.run_migrations().await?;
    info!(stage = "storage", max_connections = config.database.max_connections, "database ready");

    let store: Arc<dyn ApplicationStore> = Arc::new(database.applications());
    let state = router::AppState::new(metrics, store);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}

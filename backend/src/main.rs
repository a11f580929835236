//! Backend entry-point: wires the REST API and health probes.

use actix_web::{App, HttpServer, web};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::api;
use backend::api::health::HealthState;
use backend::config::AppConfig;
use backend::storage::StorageClient;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    let storage = StorageClient::new(&config.storage).map_err(std::io::Error::other)?;
    let storage = web::Data::new(storage);

    let health_state = web::Data::new(HealthState::new());
    // Clone for server factory so readiness probe remains accessible.
    let server_health_state = health_state.clone();
    let server_storage = storage.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_storage.clone())
            .app_data(server_health_state.clone())
            .configure(api::configure)
    })
    .bind(config.bind_addr)?;

    // Fail liveness on the first interrupt so probes report draining while
    // the server finishes in-flight requests.
    let drain_state = health_state.clone();
    actix_web::rt::spawn(async move {
        if actix_web::rt::signal::ctrl_c().await.is_ok() {
            drain_state.mark_unhealthy();
        }
    });

    info!(addr = %config.bind_addr, "listening");
    health_state.mark_ready();
    server.run().await
}

#![allow(clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod config;
mod flight_control;
mod http_handler;
mod logger;

use crate::config::OffboardConfig;
use crate::flight_control::{FlightComputer, Supervisor, TelemetryCache, fcu_link::FlightControllerLink};
use crate::http_handler::http_client::HTTPClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    let config = OffboardConfig::from_env()
        .unwrap_or_else(|err| fatal!("Invalid configuration: {err:?}"));
    info!(
        "Target: position {}, attitude {}, thrust {}, mode {}.",
        config.target_position,
        config.target_attitude(),
        config.target_thrust,
        config.target_mode
    );

    let client = Arc::new(
        HTTPClient::new(&config.bridge_url)
            .unwrap_or_else(|err| fatal!("Could not build HTTP client: {err}")),
    );
    let cache = Arc::new(TelemetryCache::new());
    let cancel = CancellationToken::new();

    let supervisor = Arc::new(Supervisor::new(Arc::clone(&cache), Arc::clone(&client), cancel.clone()));
    let state_supervisor = Arc::clone(&supervisor);
    tokio::spawn(async move {
        state_supervisor.run_state_monitor().await;
    });
    let imu_supervisor = Arc::clone(&supervisor);
    tokio::spawn(async move {
        imu_supervisor.run_imu_monitor().await;
    });

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Could not listen for interrupt: {err}");
            return;
        }
        info!("Interrupt received, shutting down.");
        shutdown.cancel();
    });

    let link: Arc<dyn FlightControllerLink> = client;
    let mut f_comp = FlightComputer::new(&config, cache, link);
    f_comp.run(cancel).await;
}

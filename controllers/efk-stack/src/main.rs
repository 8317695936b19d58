//! EFK Stack Controller
//!
//! Converges `EFKStack` resources into three Helm releases (search engine,
//! log shipper, dashboard), reports their progress in the resource status,
//! and restarts workloads whose ConfigMaps or Secrets changed.

mod config;
mod controller;
mod error;
mod mapper;
mod reconciler;
mod sessions;
mod store;
#[cfg(test)]
mod test_utils;
mod watcher;

use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::OperatorConfig;
use crate::error::ControllerError;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting EFK Stack Controller");

    let config = OperatorConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Chart directory: {}", config.chart_dir);
    info!("  Helm binary: {}", config.helm_bin);
    info!("  Helm timeout: {}s", config.helm_timeout.as_secs());

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}

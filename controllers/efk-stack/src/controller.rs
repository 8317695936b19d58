//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, the Helm session cache and the reconciler together and runs the
//! EFKStack watcher.

use std::sync::Arc;

use kube::Client;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::sessions::{CliSessionFactory, HelmSessions};
use crate::store::KubeStore;
use crate::watcher::Watcher;

/// Main controller for EFKStack resources.
pub struct Controller {
    stack_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watcher.
    pub async fn new(config: OperatorConfig) -> Result<Self, ControllerError> {
        info!("Initializing EFK Stack Controller");

        let kube_client = Client::try_default().await?;

        let sessions = HelmSessions::new(CliSessionFactory::new(&config));
        let reconciler = Arc::new(Reconciler::new(
            KubeStore::new(kube_client.clone()),
            sessions,
            config.chart_dir.clone(),
        ));

        let watcher = Watcher::new(reconciler, kube_client, config.watch_namespace.as_deref());
        let stack_watcher = tokio::spawn(async move { watcher.watch_stacks().await });

        Ok(Self { stack_watcher })
    }

    /// Runs until the watcher exits.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("EFK Stack Controller running");

        self.stack_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("EFKStack watcher panicked: {e}")))?
            .map_err(|e| ControllerError::Watch(format!("EFKStack watcher error: {e}")))
    }
}

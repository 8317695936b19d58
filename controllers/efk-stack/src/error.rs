//! Controller-specific error types.
//!
//! This module defines error types specific to the EFK Stack Controller
//! that are not covered by upstream library errors.

use std::time::Duration;

use crds::Component;
use helm_client::HelmError;
use kube::Error as KubeError;
use thiserror::Error;

/// Requeue delay after a failed pass.
pub const FAILURE_REQUEUE: Duration = Duration::from_secs(5);

/// Requeue delay after a Helm session could not be created.
pub const SESSION_FAILURE_REQUEUE: Duration = Duration::from_secs(10);

/// Errors that can occur in the EFK Stack Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Helm install/upgrade of one component failed
    #[error("{component} install/upgrade failed: {source}")]
    Deploy {
        /// Component whose release failed
        component: Component,
        /// Underlying Helm error
        #[source]
        source: HelmError,
    },

    /// Helm session for a namespace could not be created
    #[error("Failed to create Helm client: {0}")]
    HelmSession(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cluster state store rejected an object
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration drift scan failed
    #[error("Drift scan failed: {0}")]
    DriftScan(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Fixed delay before the failed resource is reconciled again.
    ///
    /// There is no backoff: every failure is retried after the same delay.
    #[must_use]
    pub fn requeue_after(&self) -> Duration {
        match self {
            ControllerError::HelmSession(_) => SESSION_FAILURE_REQUEUE,
            _ => FAILURE_REQUEUE,
        }
    }
}

//! HelmClient trait for mocking
//!
//! This trait abstracts the HelmClient to enable mocking in unit tests.
//! The CLI-backed HelmClient implements this trait, and tests can use mock implementations.

use crate::error::HelmError;
use crate::models::{ReleaseHandle, ReleaseStatus, ReleaseSummary};

/// Trait for Helm release operations within one namespace
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HelmClientTrait: Send + Sync {
    /// Namespace this client operates in
    fn namespace(&self) -> &str;

    /// Installs the chart as `release`, or upgrades it if the release already exists.
    async fn install_or_upgrade(
        &self,
        release: &str,
        chart: &str,
        values: &serde_json::Value,
    ) -> Result<ReleaseHandle, HelmError>;

    /// Current status of `release`; a missing release is `ReleaseStatus::NotFound`, not an error.
    async fn release_status(&self, release: &str) -> Result<ReleaseStatus, HelmError>;

    /// Uninstalls `release`. A release that does not exist counts as uninstalled.
    async fn uninstall(&self, release: &str) -> Result<(), HelmError>;

    /// Lists the releases of the namespace, in every state.
    async fn list_releases(&self) -> Result<Vec<ReleaseSummary>, HelmError>;
}

//! Mock HelmClient for unit testing
//!
//! This module provides a mock implementation of HelmClientTrait that can be used
//! in unit tests without a helm binary or a cluster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::HelmError;
use crate::helm_trait::HelmClientTrait;
use crate::models::{ReleaseHandle, ReleaseStatus, ReleaseSummary};

#[derive(Debug, Clone)]
struct MockRelease {
    chart: String,
    values: serde_json::Value,
    revision: u32,
    status: ReleaseStatus,
}

#[derive(Debug, Default)]
struct MockState {
    releases: HashMap<String, MockRelease>,
    // Status a release reports after its next install/upgrade (default: deployed)
    status_after_install: HashMap<String, ReleaseStatus>,
    install_failures: HashMap<String, String>,
    status_failures: HashMap<String, String>,
    install_calls: Vec<String>,
}

/// Mock HelmClient for testing
///
/// Releases are stored in memory. Clones share state, so a test can keep a
/// handle to inspect calls made through a boxed clone.
#[derive(Debug, Clone)]
pub struct MockHelmClient {
    namespace: String,
    state: Arc<Mutex<MockState>>,
}

impl MockHelmClient {
    /// Create a new mock client for `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Status `release` reports after its next install/upgrade
    pub fn set_status_after_install(&self, release: &str, status: ReleaseStatus) {
        self.state()
            .status_after_install
            .insert(release.to_string(), status);
    }

    /// Make every install/upgrade of `release` fail with `message`
    pub fn fail_install(&self, release: &str, message: &str) {
        self.state()
            .install_failures
            .insert(release.to_string(), message.to_string());
    }

    /// Make status queries for `release` fail with `message`
    pub fn fail_status(&self, release: &str, message: &str) {
        self.state()
            .status_failures
            .insert(release.to_string(), message.to_string());
    }

    /// Remove all configured failures
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.install_failures.clear();
        state.status_failures.clear();
    }

    /// Release names passed to `install_or_upgrade`, in call order
    pub fn install_calls(&self) -> Vec<String> {
        self.state().install_calls.clone()
    }

    /// Values of the last successful install/upgrade of `release`
    pub fn values_for(&self, release: &str) -> Option<serde_json::Value> {
        self.state().releases.get(release).map(|r| r.values.clone())
    }

    /// Chart of the last successful install/upgrade of `release`
    pub fn chart_for(&self, release: &str) -> Option<String> {
        self.state().releases.get(release).map(|r| r.chart.clone())
    }
}

#[async_trait::async_trait]
impl HelmClientTrait for MockHelmClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn install_or_upgrade(
        &self,
        release: &str,
        chart: &str,
        values: &serde_json::Value,
    ) -> Result<ReleaseHandle, HelmError> {
        let mut state = self.state();
        state.install_calls.push(release.to_string());

        if let Some(message) = state.install_failures.get(release) {
            return Err(HelmError::Command {
                command: "upgrade".to_string(),
                stderr: message.clone(),
            });
        }

        let status = state
            .status_after_install
            .get(release)
            .cloned()
            .unwrap_or(ReleaseStatus::Deployed);
        let revision = state.releases.get(release).map_or(1, |r| r.revision + 1);
        state.releases.insert(
            release.to_string(),
            MockRelease {
                chart: chart.to_string(),
                values: values.clone(),
                revision,
                status: status.clone(),
            },
        );

        Ok(ReleaseHandle {
            name: release.to_string(),
            namespace: self.namespace.clone(),
            revision,
            status,
        })
    }

    async fn release_status(&self, release: &str) -> Result<ReleaseStatus, HelmError> {
        let state = self.state();
        if let Some(message) = state.status_failures.get(release) {
            return Err(HelmError::Command {
                command: "status".to_string(),
                stderr: message.clone(),
            });
        }
        Ok(state
            .releases
            .get(release)
            .map_or(ReleaseStatus::NotFound, |r| r.status.clone()))
    }

    async fn uninstall(&self, release: &str) -> Result<(), HelmError> {
        self.state().releases.remove(release);
        Ok(())
    }

    async fn list_releases(&self) -> Result<Vec<ReleaseSummary>, HelmError> {
        let state = self.state();
        let mut releases: Vec<ReleaseSummary> = state
            .releases
            .iter()
            .map(|(name, r)| ReleaseSummary {
                name: name.clone(),
                namespace: self.namespace.clone(),
                revision: r.revision.to_string(),
                status: r.status.to_string(),
                chart: r.chart.clone(),
                app_version: String::new(),
            })
            .collect();
        releases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(releases)
    }
}

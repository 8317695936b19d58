//! Controller configuration, loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::error::ControllerError;

/// Default chart root; each component chart lives in a subdirectory.
pub const DEFAULT_CHART_DIR: &str = "helm-charts/efk-stack";

/// Runtime configuration of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace to watch (`WATCH_NAMESPACE`); all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Chart root directory (`CHART_DIR`)
    pub chart_dir: String,
    /// Helm binary (`HELM_BIN`)
    pub helm_bin: String,
    /// Helm operation timeout (`HELM_TIMEOUT_SECS`)
    pub helm_timeout: Duration,
}

impl OperatorConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let helm_timeout = match non_empty("HELM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    ControllerError::InvalidConfig(format!(
                        "HELM_TIMEOUT_SECS must be a number of seconds, got '{raw}': {e}"
                    ))
                })?;
                if secs == 0 {
                    return Err(ControllerError::InvalidConfig(
                        "HELM_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => helm_client::client::DEFAULT_TIMEOUT,
        };

        Ok(Self {
            watch_namespace: non_empty("WATCH_NAMESPACE"),
            chart_dir: non_empty("CHART_DIR")
                .map(|dir| dir.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_CHART_DIR.to_string()),
            helm_bin: non_empty("HELM_BIN").unwrap_or_else(|| "helm".to_string()),
            helm_timeout,
        })
    }
}

//! Helm release models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a release as reported by Helm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// `deployed`: the last install/upgrade finished
    Deployed,
    /// No release with that name exists
    NotFound,
    /// Any other Helm status (`pending-install`, `failed`, ...)
    Other(String),
}

impl ReleaseStatus {
    /// Maps a raw Helm status string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "deployed" => ReleaseStatus::Deployed,
            "" | "NotFound" => ReleaseStatus::NotFound,
            other => ReleaseStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseStatus::Deployed => f.write_str("deployed"),
            ReleaseStatus::NotFound => f.write_str("NotFound"),
            ReleaseStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Release returned by an install or upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHandle {
    /// Release name
    pub name: String,
    /// Namespace the release lives in
    pub namespace: String,
    /// Release revision
    pub revision: u32,
    /// Status right after the operation
    pub status: ReleaseStatus,
}

/// One entry of `helm list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Release name
    pub name: String,
    /// Namespace
    #[serde(default)]
    pub namespace: String,
    /// Revision, as printed by helm
    #[serde(default)]
    pub revision: String,
    /// Raw status string
    #[serde(default)]
    pub status: String,
    /// Chart name and version
    #[serde(default)]
    pub chart: String,
    /// Application version
    #[serde(default)]
    pub app_version: String,
}

/// Subset of the release object printed by `helm status -o json` and
/// `helm upgrade -o json`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReleaseDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub info: ReleaseInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ReleaseInfo {
    #[serde(default)]
    pub status: String,
}

impl From<ReleaseDocument> for ReleaseHandle {
    fn from(doc: ReleaseDocument) -> Self {
        Self {
            name: doc.name,
            namespace: doc.namespace,
            revision: doc.version,
            status: ReleaseStatus::parse(&doc.info.status),
        }
    }
}

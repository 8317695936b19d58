//! EFKStack Custom Resource Definition
//!
//! Declares a complete logging stack: a search engine (Elasticsearch), a log
//! shipper (Fluent Bit) and a dashboard (Kibana). The controller deploys each
//! component as a Helm release and reports progress in `status`.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::status::EFKStackStatus;

/// EFKStackSpec defines the desired state of a logging stack
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "logging.efk.io",
    version = "v1",
    kind = "EFKStack",
    namespaced,
    status = "EFKStackStatus",
    shortname = "efk",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"SearchEngine","type":"string","jsonPath":".status.searchEngine.state"}"#,
    printcolumn = r#"{"name":"LogShipper","type":"string","jsonPath":".status.logShipper.state"}"#,
    printcolumn = r#"{"name":"Dashboard","type":"string","jsonPath":".status.dashboard.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EFKStackSpec {
    /// Global stack version (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Namespace the releases are installed into (defaults to the EFKStack namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Search engine (Elasticsearch) configuration
    pub search_engine: SearchEngineSpec,

    /// Log shipper (Fluent Bit) configuration
    pub log_shipper: LogShipperSpec,

    /// Dashboard (Kibana) configuration
    pub dashboard: DashboardSpec,

    /// Settings shared by all components
    #[serde(default)]
    pub global: GlobalSpec,
}

/// Search engine deployment mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngineMode {
    /// Single node; the replica count is forced to 1
    Singleton,
    /// Multi-node cluster
    #[default]
    Cluster,
}

impl SearchEngineMode {
    /// Value passed to the chart.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchEngineMode::Singleton => "singleton",
            SearchEngineMode::Cluster => "cluster",
        }
    }
}

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchEngineSpec {
    /// Elasticsearch version
    pub version: String,

    /// Deployment mode: "singleton" (single node) or "cluster" (multi-node)
    #[serde(default)]
    pub mode: SearchEngineMode,

    /// Number of replicas (ignored in singleton mode, forced to 1)
    #[serde(default = "default_search_engine_replicas")]
    #[schemars(range(min = 1))]
    pub replicas: i32,

    /// CPU and memory requests/limits
    #[serde(default)]
    pub resources: ResourceSpec,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageSpec,

    /// Security configuration
    #[serde(default)]
    pub security: SecuritySpec,

    /// Additional key/value settings passed to the chart
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,

    /// Node selector for scheduling pods onto specific nodes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Tolerations allowing pods onto tainted nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

fn default_search_engine_replicas() -> i32 {
    3
}

impl SearchEngineSpec {
    /// Replica count actually requested from the chart.
    ///
    /// Singleton mode always runs exactly one node, whatever was declared.
    #[must_use]
    pub fn effective_replicas(&self) -> i32 {
        match self.mode {
            SearchEngineMode::Singleton => 1,
            SearchEngineMode::Cluster => self.replicas,
        }
    }
}

impl Default for SearchEngineSpec {
    fn default() -> Self {
        Self {
            version: String::new(),
            mode: SearchEngineMode::default(),
            replicas: default_search_engine_replicas(),
            resources: ResourceSpec::default(),
            storage: StorageSpec::default(),
            security: SecuritySpec::default(),
            config: BTreeMap::new(),
            node_selector: BTreeMap::new(),
            tolerations: Vec::new(),
        }
    }
}

/// Log shipper configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogShipperSpec {
    /// Fluent Bit version
    pub version: String,

    /// Fixed replica count. When unset the shipper runs on every node
    /// (DaemonSet) and receives default tolerations for common taints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub replicas: Option<i32>,

    /// CPU and memory requests/limits
    #[serde(default)]
    pub resources: ResourceSpec,

    /// Fluent Bit pipeline sections
    #[serde(default)]
    pub config: LogShipperConfig,

    /// Node selector for scheduling pods onto specific nodes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Tolerations allowing pods onto tainted nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

/// Fluent Bit pipeline sections, passed to the chart verbatim
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogShipperConfig {
    /// Input section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Filter section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Output section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Service section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSpec {
    /// Kibana version
    pub version: String,

    /// Number of replicas
    #[serde(default = "default_dashboard_replicas")]
    #[schemars(range(min = 1))]
    pub replicas: i32,

    /// CPU and memory requests/limits
    #[serde(default)]
    pub resources: ResourceSpec,

    /// Ingress exposure
    #[serde(default)]
    pub ingress: IngressSpec,

    /// Node selector for scheduling pods onto specific nodes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Tolerations allowing pods onto tainted nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

fn default_dashboard_replicas() -> i32 {
    2
}

impl Default for DashboardSpec {
    fn default() -> Self {
        Self {
            version: String::new(),
            replicas: default_dashboard_replicas(),
            resources: ResourceSpec::default(),
            ingress: IngressSpec::default(),
            node_selector: BTreeMap::new(),
            tolerations: Vec::new(),
        }
    }
}

/// CPU/memory quantities, as Kubernetes quantity strings ("500m", "2Gi")
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    /// CPU quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// Memory quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl ResourceList {
    /// True when neither quantity is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Resource requests and limits
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// Minimum resources guaranteed to each pod
    #[serde(default)]
    pub requests: ResourceList,

    /// Maximum resources each pod may use
    #[serde(default)]
    pub limits: ResourceList,
}

/// Pod toleration, in the shape Kubernetes and Helm charts expect
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    /// Taint key (empty with operator Exists matches every key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// "Exists" or "Equal"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    /// Taint value (operator Equal only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// "NoSchedule", "PreferNoSchedule" or "NoExecute"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,

    /// How long a NoExecute taint is tolerated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toleration_seconds: Option<i64>,
}

impl Toleration {
    /// Tolerates every taint with the given effect.
    #[must_use]
    pub fn exists(effect: &str) -> Self {
        Self {
            operator: Some("Exists".to_string()),
            effect: Some(effect.to_string()),
            ..Default::default()
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    /// Storage class name (falls back to `global.storageClass`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    /// Volume size, e.g. "30Gi"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^[0-9]+(Gi|Mi)$"))]
    pub size: Option<String>,

    /// Volume type (persistentVolumeClaim, emptyDir, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,

    /// Custom path on shared filesystems
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    /// Enable TLS on the transport and HTTP layers
    #[serde(default = "default_true")]
    pub tls_enabled: bool,

    /// Enable authentication
    #[serde(default = "default_true")]
    pub auth_enabled: bool,

    /// Secret holding TLS certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret_name: Option<String>,

    /// Secret holding credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for SecuritySpec {
    fn default() -> Self {
        Self {
            tls_enabled: true,
            auth_enabled: true,
            tls_secret_name: None,
            auth_secret_name: None,
        }
    }
}

/// Ingress configuration for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    /// Create an Ingress
    #[serde(default)]
    pub enabled: bool,

    /// Hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Ingress annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// TLS entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls: Vec<IngressTls>,
}

/// Ingress TLS entry
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngressTls {
    /// Hosts covered by the certificate
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Secret holding the certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// Settings shared by all components
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSpec {
    /// Default storage class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Image registry override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_registry: Option<String>,

    /// Global TLS settings
    #[serde(default)]
    pub tls: GlobalTlsSpec,
}

/// Global TLS settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalTlsSpec {
    /// Enable TLS
    #[serde(default)]
    pub enabled: bool,

    /// Secret holding certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

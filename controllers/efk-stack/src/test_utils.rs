//! Test utilities for unit testing the reconciler
//!
//! In-memory cluster store, Helm session factory, and builders for the
//! objects the controller reads.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use crds::{EFKStack, EFKStackSpec, EFKStackStatus};
use helm_client::{HelmClientTrait, HelmError, MockHelmClient};
use k8s_openapi::api::apps::v1::{
    DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec,
};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;

use crate::error::ControllerError;
use crate::sessions::{HelmSessionFactory, HelmSessions};
use crate::store::{ClusterStore, Workload};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn metadata(name: &str, namespace: &str, instance: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: instance.map(|release| {
            BTreeMap::from([(crds::INSTANCE_LABEL.to_string(), release.to_string())])
        }),
        ..Default::default()
    }
}

/// Helper to create a test EFKStack with component versions set
pub fn test_stack(name: &str, namespace: &str) -> EFKStack {
    let mut spec = EFKStackSpec::default();
    spec.search_engine.version = "8.11.0".to_string();
    spec.log_shipper.version = "2.2.0".to_string();
    spec.dashboard.version = "8.11.0".to_string();

    let mut stack = EFKStack::new(name, spec);
    stack.metadata.namespace = Some(namespace.to_string());
    stack.metadata.generation = Some(1);
    stack
}

pub fn config_map(name: &str, namespace: &str, instance: Option<&str>, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: metadata(name, namespace, instance),
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ),
        ..Default::default()
    }
}

/// ConfigMap carrying only `binaryData`.
pub fn binary_config_map(name: &str, namespace: &str, instance: Option<&str>, data: &[(&str, &[u8])]) -> ConfigMap {
    ConfigMap {
        metadata: metadata(name, namespace, instance),
        binary_data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn secret(name: &str, namespace: &str, instance: Option<&str>, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: metadata(name, namespace, instance),
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn deployment(name: &str, namespace: &str, instance: &str) -> Workload {
    Workload::Deployment(Deployment {
        metadata: metadata(name, namespace, Some(instance)),
        spec: Some(DeploymentSpec::default()),
        ..Default::default()
    })
}

pub fn daemon_set(name: &str, namespace: &str, instance: &str) -> Workload {
    Workload::DaemonSet(DaemonSet {
        metadata: metadata(name, namespace, Some(instance)),
        spec: Some(DaemonSetSpec::default()),
        ..Default::default()
    })
}

pub fn stateful_set(name: &str, namespace: &str, instance: &str) -> Workload {
    Workload::StatefulSet(StatefulSet {
        metadata: metadata(name, namespace, Some(instance)),
        spec: Some(StatefulSetSpec::default()),
        ..Default::default()
    })
}

fn workload_meta(workload: &Workload) -> &ObjectMeta {
    match workload {
        Workload::Deployment(d) => &d.metadata,
        Workload::DaemonSet(d) => &d.metadata,
        Workload::StatefulSet(s) => &s.metadata,
    }
}

/// True when `labels` satisfy an equality selector `key=value`.
fn selector_matches(selector: &str, labels: &BTreeMap<String, String>) -> bool {
    selector.split(',').all(|term| match term.split_once('=') {
        Some((key, value)) => labels.get(key).is_some_and(|v| v == value),
        None => labels.contains_key(term),
    })
}

#[derive(Default)]
struct MockStoreState {
    stacks: HashMap<(String, String), EFKStack>,
    config_maps: Vec<ConfigMap>,
    secrets: Vec<Secret>,
    workloads: Vec<Workload>,
    status_patches: Vec<EFKStackStatus>,
    replaced: Vec<String>,
    fail_config_map_list: bool,
    fail_workload_replace: bool,
}

/// In-memory cluster store. Clones share state.
#[derive(Clone, Default)]
pub struct MockClusterStore {
    state: Arc<Mutex<MockStoreState>>,
}

impl MockClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stack(&self, stack: EFKStack) {
        let key = (stack.namespace().unwrap_or_default(), stack.name_any());
        lock(&self.state).stacks.insert(key, stack);
    }

    pub fn add_config_map(&self, cm: ConfigMap) {
        lock(&self.state).config_maps.push(cm);
    }

    /// Replace the data of an existing ConfigMap.
    pub fn update_config_map(&self, name: &str, data: &[(&str, &str)]) {
        let mut state = lock(&self.state);
        if let Some(cm) = state.config_maps.iter_mut().find(|cm| cm.name_any() == name) {
            cm.data = Some(
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            );
        }
    }

    /// Replace the binary data of an existing ConfigMap.
    pub fn update_config_map_binary(&self, name: &str, data: &[(&str, &[u8])]) {
        let mut state = lock(&self.state);
        if let Some(cm) = state.config_maps.iter_mut().find(|cm| cm.name_any() == name) {
            cm.binary_data = Some(
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), ByteString(v.to_vec())))
                    .collect(),
            );
        }
    }

    pub fn add_secret(&self, secret: Secret) {
        lock(&self.state).secrets.push(secret);
    }

    pub fn add_workload(&self, workload: Workload) {
        lock(&self.state).workloads.push(workload);
    }

    pub fn fail_config_map_list(&self, fail: bool) {
        lock(&self.state).fail_config_map_list = fail;
    }

    pub fn fail_workload_replace(&self, fail: bool) {
        lock(&self.state).fail_workload_replace = fail;
    }

    /// Current stored status of a stack
    pub fn status(&self, namespace: &str, name: &str) -> Option<EFKStackStatus> {
        lock(&self.state)
            .stacks
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|s| s.status.clone())
    }

    /// Every status written, in order
    pub fn status_patches(&self) -> Vec<EFKStackStatus> {
        lock(&self.state).status_patches.clone()
    }

    /// `Kind/name` of every replaced workload, in order
    pub fn replaced(&self) -> Vec<String> {
        lock(&self.state).replaced.clone()
    }

    /// Stored copy of a workload
    pub fn workload(&self, name: &str) -> Option<Workload> {
        lock(&self.state)
            .workloads
            .iter()
            .find(|w| w.name() == name)
            .cloned()
    }
}

#[async_trait]
impl ClusterStore for MockClusterStore {
    async fn get_stack(&self, namespace: &str, name: &str) -> Result<Option<EFKStack>, ControllerError> {
        Ok(lock(&self.state)
            .stacks
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn patch_stack_status(
        &self,
        namespace: &str,
        name: &str,
        status: &EFKStackStatus,
    ) -> Result<(), ControllerError> {
        let mut state = lock(&self.state);
        let Some(stack) = state.stacks.get_mut(&(namespace.to_string(), name.to_string())) else {
            return Err(ControllerError::Store(format!("EFKStack {namespace}/{name} not found")));
        };
        stack.status = Some(status.clone());
        state.status_patches.push(status.clone());
        Ok(())
    }

    async fn list_config_maps(&self, namespace: &str, selector: &str) -> Result<Vec<ConfigMap>, ControllerError> {
        let state = lock(&self.state);
        if state.fail_config_map_list {
            return Err(ControllerError::Store("configmaps is forbidden".to_string()));
        }
        Ok(state
            .config_maps
            .iter()
            .filter(|cm| cm.namespace().as_deref() == Some(namespace))
            .filter(|cm| selector_matches(selector, cm.labels()))
            .cloned()
            .collect())
    }

    async fn list_secrets(&self, namespace: &str, selector: &str) -> Result<Vec<Secret>, ControllerError> {
        Ok(lock(&self.state)
            .secrets
            .iter()
            .filter(|s| s.namespace().as_deref() == Some(namespace))
            .filter(|s| selector_matches(selector, s.labels()))
            .cloned()
            .collect())
    }

    async fn list_workloads(&self, namespace: &str, selector: &str) -> Result<Vec<Workload>, ControllerError> {
        Ok(lock(&self.state)
            .workloads
            .iter()
            .filter(|w| {
                let meta = workload_meta(w);
                meta.namespace.as_deref() == Some(namespace)
                    && meta
                        .labels
                        .as_ref()
                        .is_some_and(|labels| selector_matches(selector, labels))
            })
            .cloned()
            .collect())
    }

    async fn replace_workload(&self, _namespace: &str, workload: &Workload) -> Result<(), ControllerError> {
        let mut state = lock(&self.state);
        if state.fail_workload_replace {
            return Err(ControllerError::Store("conflict".to_string()));
        }
        let name = workload.name();
        if let Some(stored) = state.workloads.iter_mut().find(|w| w.name() == name) {
            *stored = workload.clone();
        }
        state.replaced.push(format!("{}/{}", workload.kind(), name));
        Ok(())
    }
}

/// Session factory handing out one shared `MockHelmClient` per namespace
#[derive(Clone, Default)]
pub struct MockSessionFactory {
    clients: Arc<Mutex<HashMap<String, MockHelmClient>>>,
    created: Arc<Mutex<Vec<String>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock client for `namespace`, so a test can script it before a pass.
    pub fn client(&self, namespace: &str) -> MockHelmClient {
        lock(&self.clients)
            .entry(namespace.to_string())
            .or_insert_with(|| MockHelmClient::new(namespace))
            .clone()
    }

    pub fn fail_creation(&self, fail: bool) {
        *lock(&self.fail) = fail;
    }

    /// Namespaces a session was created for, in order
    pub fn created(&self) -> Vec<String> {
        lock(&self.created).clone()
    }
}

impl HelmSessionFactory for MockSessionFactory {
    fn create(&self, namespace: &str) -> Result<Arc<dyn HelmClientTrait>, HelmError> {
        if *lock(&self.fail) {
            return Err(HelmError::InvalidRequest("helm unavailable".to_string()));
        }
        lock(&self.created).push(namespace.to_string());
        Ok(Arc::new(self.client(namespace)))
    }
}

/// Reconciler over a mock store and mock Helm sessions
pub fn test_reconciler(store: &MockClusterStore, factory: &MockSessionFactory) -> crate::reconciler::Reconciler {
    crate::reconciler::Reconciler::new(
        store.clone(),
        HelmSessions::new(factory.clone()),
        "charts",
    )
}

//! Cluster state store.
//!
//! Everything the reconciler and the drift detector read from or write to the
//! API server goes through [`ClusterStore`], so both can be unit tested
//! against an in-memory store.

use async_trait::async_trait;
use crds::{EFKStack, EFKStackStatus};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, PodTemplateSpec, Secret};
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use crate::error::ControllerError;

/// A workload whose pod template can carry restart annotations.
#[derive(Debug, Clone)]
pub enum Workload {
    Deployment(Deployment),
    DaemonSet(DaemonSet),
    StatefulSet(StatefulSet),
}

impl Workload {
    /// Kubernetes kind of the wrapped object.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Workload::Deployment(_) => "Deployment",
            Workload::DaemonSet(_) => "DaemonSet",
            Workload::StatefulSet(_) => "StatefulSet",
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Workload::Deployment(d) => d.name_any(),
            Workload::DaemonSet(d) => d.name_any(),
            Workload::StatefulSet(s) => s.name_any(),
        }
    }

    /// Pod template, if the object has a spec.
    pub fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        match self {
            Workload::Deployment(d) => d.spec.as_mut().map(|s| &mut s.template),
            Workload::DaemonSet(d) => d.spec.as_mut().map(|s| &mut s.template),
            Workload::StatefulSet(s) => s.spec.as_mut().map(|s| &mut s.template),
        }
    }
}

/// Read/write access to the cluster objects the controller works with
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch an EFKStack; `None` when it no longer exists.
    async fn get_stack(&self, namespace: &str, name: &str) -> Result<Option<EFKStack>, ControllerError>;

    /// Replace the status subresource of an EFKStack.
    async fn patch_stack_status(
        &self,
        namespace: &str,
        name: &str,
        status: &EFKStackStatus,
    ) -> Result<(), ControllerError>;

    async fn list_config_maps(&self, namespace: &str, selector: &str) -> Result<Vec<ConfigMap>, ControllerError>;

    async fn list_secrets(&self, namespace: &str, selector: &str) -> Result<Vec<Secret>, ControllerError>;

    /// Deployments, DaemonSets and StatefulSets matching `selector`.
    async fn list_workloads(&self, namespace: &str, selector: &str) -> Result<Vec<Workload>, ControllerError>;

    /// Write back a workload, including its pod template.
    async fn replace_workload(&self, namespace: &str, workload: &Workload) -> Result<(), ControllerError>;
}

/// [`ClusterStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_stack(&self, namespace: &str, name: &str) -> Result<Option<EFKStack>, ControllerError> {
        let api: Api<EFKStack> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn patch_stack_status(
        &self,
        namespace: &str,
        name: &str,
        status: &EFKStackStatus,
    ) -> Result<(), ControllerError> {
        let api: Api<EFKStack> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": serde_json::to_value(status)? });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        debug!("Patched status of EFKStack {}/{}", namespace, name);
        Ok(())
    }

    async fn list_config_maps(&self, namespace: &str, selector: &str) -> Result<Vec<ConfigMap>, ControllerError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default().labels(selector)).await?.items)
    }

    async fn list_secrets(&self, namespace: &str, selector: &str) -> Result<Vec<Secret>, ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default().labels(selector)).await?.items)
    }

    async fn list_workloads(&self, namespace: &str, selector: &str) -> Result<Vec<Workload>, ControllerError> {
        let params = ListParams::default().labels(selector);
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let daemon_sets: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
        let stateful_sets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);

        let mut workloads: Vec<Workload> = deployments
            .list(&params)
            .await?
            .items
            .into_iter()
            .map(Workload::Deployment)
            .collect();
        workloads.extend(daemon_sets.list(&params).await?.items.into_iter().map(Workload::DaemonSet));
        workloads.extend(stateful_sets.list(&params).await?.items.into_iter().map(Workload::StatefulSet));
        Ok(workloads)
    }

    async fn replace_workload(&self, namespace: &str, workload: &Workload) -> Result<(), ControllerError> {
        let name = workload.name();
        if name.is_empty() {
            return Err(ControllerError::Store(format!(
                "{} in namespace {} has no name",
                workload.kind(),
                namespace
            )));
        }

        let params = PostParams::default();
        match workload {
            Workload::Deployment(d) => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.replace(&name, &params, d).await?;
            }
            Workload::DaemonSet(d) => {
                let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
                api.replace(&name, &params, d).await?;
            }
            Workload::StatefulSet(s) => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                api.replace(&name, &params, s).await?;
            }
        }
        Ok(())
    }
}

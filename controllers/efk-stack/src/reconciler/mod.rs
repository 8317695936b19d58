//! Reconciliation logic for EFKStack resources.
//!
//! One pass converges the three component releases in dependency order:
//! - `values`: Helm values for each release
//! - `status`: phase and `Ready` condition
//! - `drift`: restart workloads whose configuration changed

pub mod drift;
#[cfg(test)]
mod drift_test;
pub mod status;
pub mod values;

use chrono::Utc;
use crds::{Component, ComponentState, EFKStack, EFKStackStatus, StackPhase};
use helm_client::{HelmClientTrait, ReleaseStatus};
use kube_runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error, info, warn};

use crate::error::ControllerError;
use crate::sessions::HelmSessions;
use crate::store::ClusterStore;

/// Namespace used when neither the spec nor the request names one.
const FALLBACK_NAMESPACE: &str = "default";

/// Reconciles EFKStack resources.
pub struct Reconciler {
    pub(crate) store: Box<dyn ClusterStore>,
    pub(crate) sessions: HelmSessions,
    pub(crate) chart_dir: String,
}

/// What a single component step needs to know about the pass.
struct Pass<'a> {
    stack: &'a EFKStack,
    name: String,
    /// Namespace of the EFKStack object
    namespace: &'a str,
    /// Namespace the releases live in
    target_namespace: String,
    helm: &'a dyn HelmClientTrait,
}

impl Reconciler {
    pub fn new(store: impl ClusterStore + 'static, sessions: HelmSessions, chart_dir: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            sessions,
            chart_dir: chart_dir.into(),
        }
    }

    /// Run one convergence pass for the EFKStack `namespace/name`.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Action, ControllerError> {
        info!("Reconciling EFKStack {}/{}", namespace, name);

        let Some(mut stack) = self.store.get_stack(namespace, name).await? else {
            info!("EFKStack {}/{} not found, it must have been deleted", namespace, name);
            return Ok(Action::await_change());
        };

        let target_namespace = effective_namespace(&stack, namespace);
        let mut status = stack.status.take().unwrap_or_default();

        if status.phase.is_none() {
            status.phase = Some(StackPhase::Pending);
            self.store.patch_stack_status(namespace, name, &status).await?;
            debug!("Initialized status of EFKStack {}/{}", namespace, name);
        }

        let helm = self.sessions.get_or_create(&target_namespace)?;
        let pass = Pass {
            stack: &stack,
            name: name.to_string(),
            namespace,
            target_namespace,
            helm: helm.as_ref(),
        };

        self.reconcile_component(&pass, &mut status, Component::SearchEngine).await?;
        if status.search_engine.state == ComponentState::Ready {
            self.reconcile_component(&pass, &mut status, Component::LogShipper).await?;
            self.reconcile_component(&pass, &mut status, Component::Dashboard).await?;
        } else {
            debug!(
                "Search engine of EFKStack {}/{} is {}, waiting before deploying the rest",
                namespace, name, status.search_engine.state
            );
        }

        let phase = status::refresh(&mut status, stack.metadata.generation, Utc::now());
        self.store.patch_stack_status(namespace, name, &status).await?;
        info!("EFKStack {}/{} is {}", namespace, name, phase);

        match drift::sync_stack(self.store.as_ref(), &pass.target_namespace, name, Utc::now()).await {
            Ok(0) => {}
            Ok(restarted) => info!(
                "Restarted {} workload(s) of EFKStack {}/{} after configuration changes",
                restarted, namespace, name
            ),
            Err(e) => warn!("Configuration drift check for EFKStack {}/{} failed: {}", namespace, name, e),
        }

        Ok(Action::requeue(status::requeue_after(phase)))
    }

    /// Install or upgrade one component release and record what happened.
    async fn reconcile_component(
        &self,
        pass: &Pass<'_>,
        status: &mut EFKStackStatus,
        component: Component,
    ) -> Result<(), ControllerError> {
        let release = component.release_name(&pass.name);
        let chart = format!("{}/{}", self.chart_dir, component.chart_name());
        let values = values::release_values(component, &pass.name, &pass.stack.spec);

        debug!(
            "Installing {} release {}/{} from {}",
            component, pass.target_namespace, release, chart
        );

        if let Err(e) = pass.helm.install_or_upgrade(&release, &chart, &values).await {
            let mut message = format!("Helm install/upgrade failed: {e}");
            if let Ok(current) = pass.helm.release_status(&release).await {
                message = format!("{message} (Release status: {current})");
            }
            error!("{} of EFKStack {}/{}: {}", component, pass.namespace, pass.name, message);

            let observed = status.component_mut(component);
            observed.state = ComponentState::Error;
            observed.message = Some(message);
            status::refresh(status, pass.stack.metadata.generation, Utc::now());
            if let Err(persist_err) = self.store.patch_stack_status(pass.namespace, &pass.name, status).await {
                error!(
                    "Failed to record {} failure on EFKStack {}/{}: {}",
                    component, pass.namespace, pass.name, persist_err
                );
            }
            return Err(ControllerError::Deploy { component, source: e });
        }

        let release_status = pass.helm.release_status(&release).await;
        let observed = status.component_mut(component);
        observed.version = Some(component_version(pass.stack, component).to_string());
        match release_status {
            Ok(ReleaseStatus::Deployed) => {
                observed.state = ComponentState::Ready;
                if let Some(replicas) = desired_replicas(pass.stack, component) {
                    observed.ready_replicas = replicas;
                }
                observed.message = None;
                observed.url = component_url(pass.stack, &pass.name, component);
                info!("{} of EFKStack {}/{} is ready", component, pass.namespace, pass.name);
            }
            Ok(other) => {
                observed.state = ComponentState::Deploying;
                observed.message = Some(format!("Release status: {other}"));
                info!(
                    "{} of EFKStack {}/{} is deploying (release status {})",
                    component, pass.namespace, pass.name, other
                );
            }
            Err(e) => {
                warn!(
                    "Failed to get status of release {}/{}: {}",
                    pass.target_namespace, release, e
                );
                observed.state = ComponentState::Deploying;
                observed.message = Some(format!("Failed to get release status: {e}"));
            }
        }

        status::refresh(status, pass.stack.metadata.generation, Utc::now());
        self.store.patch_stack_status(pass.namespace, &pass.name, status).await
    }
}

/// Namespace the releases of `stack` are installed into.
fn effective_namespace(stack: &EFKStack, request_namespace: &str) -> String {
    [stack.spec.namespace.as_deref(), Some(request_namespace)]
        .into_iter()
        .flatten()
        .find(|ns| !ns.is_empty())
        .unwrap_or(FALLBACK_NAMESPACE)
        .to_string()
}

fn component_version(stack: &EFKStack, component: Component) -> &str {
    match component {
        Component::SearchEngine => &stack.spec.search_engine.version,
        Component::LogShipper => &stack.spec.log_shipper.version,
        Component::Dashboard => &stack.spec.dashboard.version,
    }
}

/// Replica count a deployed release runs; `None` for a per-node log shipper.
fn desired_replicas(stack: &EFKStack, component: Component) -> Option<i32> {
    match component {
        Component::SearchEngine => Some(stack.spec.search_engine.effective_replicas()),
        Component::LogShipper => stack.spec.log_shipper.replicas,
        Component::Dashboard => Some(stack.spec.dashboard.replicas),
    }
}

fn component_url(stack: &EFKStack, name: &str, component: Component) -> Option<String> {
    match component {
        Component::SearchEngine => Some(values::search_engine_url(name)),
        Component::LogShipper => None,
        Component::Dashboard => {
            let ingress = &stack.spec.dashboard.ingress;
            ingress
                .host
                .as_deref()
                .filter(|host| ingress.enabled && !host.is_empty())
                .map(|host| format!("https://{host}"))
        }
    }
}

/// Name used in logs for a stack.
pub(crate) fn stack_key(stack: &EFKStack) -> String {
    format!("{}/{}", stack.namespace().unwrap_or_default(), stack.name_any())
}

//! Kubernetes resource watchers.
//!
//! EFKStack objects are watched through `kube_runtime::Controller`, which
//! handles reconnection and guarantees at most one reconcile in flight per
//! object. ConfigMap and Secret events are mapped back to their stack so a
//! configuration change is picked up without waiting for the next requeue.

use std::sync::Arc;
use std::time::Duration;

use crds::EFKStack;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{watcher, Controller};
use tracing::{debug, error, info};

use crate::error::ControllerError;
use crate::mapper;
use crate::reconciler::{stack_key, Reconciler};

/// Events arriving within this window are folded into one reconcile.
const DEBOUNCE: Duration = Duration::from_secs(1);

/// Maximum number of stacks reconciled at the same time.
const CONCURRENCY: u16 = 4;

async fn reconcile(stack: Arc<EFKStack>, ctx: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let namespace = stack.namespace().unwrap_or_default();
    ctx.reconcile(&namespace, &stack.name_any()).await
}

fn error_policy(stack: Arc<EFKStack>, error: &ControllerError, _ctx: Arc<Reconciler>) -> Action {
    let delay = error.requeue_after();
    error!(
        "Reconciliation of EFKStack {} failed, retrying in {}s: {}",
        stack_key(&stack),
        delay.as_secs(),
        error
    );
    Action::requeue(delay)
}

/// Watches EFKStacks and the configuration objects their releases render.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    stack_api: Api<EFKStack>,
    config_map_api: Api<ConfigMap>,
    secret_api: Api<Secret>,
}

impl Watcher {
    /// Creates a watcher scoped to `namespace`, or to all namespaces.
    pub fn new(reconciler: Arc<Reconciler>, client: Client, namespace: Option<&str>) -> Self {
        match namespace {
            Some(ns) => Self {
                reconciler,
                stack_api: Api::namespaced(client.clone(), ns),
                config_map_api: Api::namespaced(client.clone(), ns),
                secret_api: Api::namespaced(client, ns),
            },
            None => Self {
                reconciler,
                stack_api: Api::all(client.clone()),
                config_map_api: Api::all(client.clone()),
                secret_api: Api::all(client),
            },
        }
    }

    /// Runs the EFKStack controller until shutdown.
    pub async fn watch_stacks(&self) -> Result<(), ControllerError> {
        info!("Starting EFKStack watcher");

        let controller = Controller::new(self.stack_api.clone(), watcher::Config::default());
        let stacks = controller.store();
        let stacks_for_secrets = stacks.clone();

        controller
            .watches(
                self.config_map_api.clone(),
                watcher::Config::default(),
                move |cm: ConfigMap| {
                    let target = mapper::owning_stack(&cm, &stacks.state());
                    if let Some(target) = &target {
                        debug!("ConfigMap {} changed, requeueing EFKStack {}", cm.name_any(), target);
                    }
                    target
                },
            )
            .watches(
                self.secret_api.clone(),
                watcher::Config::default(),
                move |secret: Secret| {
                    let target = mapper::owning_stack(&secret, &stacks_for_secrets.state());
                    if let Some(target) = &target {
                        debug!("Secret {} changed, requeueing EFKStack {}", secret.name_any(), target);
                    }
                    target
                },
            )
            .with_config(ControllerConfig::default().debounce(DEBOUNCE).concurrency(CONCURRENCY))
            .shutdown_on_signal()
            .run(reconcile, error_policy, Arc::clone(&self.reconciler))
            .for_each(|res| async move {
                match res {
                    Ok((obj, action)) => debug!("Reconciled EFKStack {}: {:?}", obj, action),
                    Err(e) => error!("EFKStack controller error: {}", e),
                }
            })
            .await;

        info!("EFKStack watcher stopped");
        Ok(())
    }
}

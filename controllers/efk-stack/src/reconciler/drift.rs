//! Configuration drift detection.
//!
//! Workloads do not restart when a mounted ConfigMap or Secret changes. For
//! every release, the data of its labelled ConfigMaps and Secrets is hashed
//! and the hash is stamped on the pod templates of the release's workloads;
//! a new hash rolls the pods.

use chrono::{DateTime, SecondsFormat, Utc};
use crds::{Component, INSTANCE_LABEL};
use k8s_openapi::api::core::v1::{ConfigMap, PodTemplateSpec, Secret};
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::ControllerError;
use crate::store::ClusterStore;

/// Pod template annotation holding the configuration fingerprint.
pub const CONFIG_HASH_ANNOTATION: &str = "logging.efk.io/config-hash";

/// Pod template annotation recording when the fingerprint last changed.
pub const CONFIG_UPDATED_ANNOTATION: &str = "logging.efk.io/config-updated";

/// Length of the fingerprint, in hex characters.
const FINGERPRINT_LEN: usize = 16;

/// Stable fingerprint of the data held by `config_maps` and `secrets`.
///
/// Objects are hashed sorted by namespace and name, ConfigMaps before
/// Secrets; keys are visited in order.
#[must_use]
pub fn config_fingerprint(config_maps: &[ConfigMap], secrets: &[Secret]) -> String {
    let mut config_maps: Vec<&ConfigMap> = config_maps.iter().collect();
    config_maps.sort_by_key(|cm| (cm.namespace(), cm.name_any()));
    let mut secrets: Vec<&Secret> = secrets.iter().collect();
    secrets.sort_by_key(|s| (s.namespace(), s.name_any()));

    let mut hasher = Sha256::new();
    let mut field = |bytes: &[u8]| {
        hasher.update(bytes);
        hasher.update([0u8]);
    };

    for cm in config_maps {
        field(cm.name_any().as_bytes());
        field(cm.namespace().unwrap_or_default().as_bytes());
        for (key, value) in cm.data.iter().flatten() {
            field(key.as_bytes());
            field(value.as_bytes());
        }
        for (key, value) in cm.binary_data.iter().flatten() {
            field(key.as_bytes());
            field(&value.0);
        }
    }
    for secret in secrets {
        field(secret.name_any().as_bytes());
        field(secret.namespace().unwrap_or_default().as_bytes());
        for (key, value) in secret.data.iter().flatten() {
            field(key.as_bytes());
            field(&value.0);
        }
        for (key, value) in secret.string_data.iter().flatten() {
            field(key.as_bytes());
            field(value.as_bytes());
        }
    }

    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Stamp `fingerprint` on a pod template.
///
/// Returns false, leaving the template untouched, when it already carries
/// the fingerprint.
pub fn stamp_pod_template(template: &mut PodTemplateSpec, fingerprint: &str, now: DateTime<Utc>) -> bool {
    let annotations = template
        .metadata
        .get_or_insert_with(Default::default)
        .annotations
        .get_or_insert_with(Default::default);

    if annotations.get(CONFIG_HASH_ANNOTATION).map(String::as_str) == Some(fingerprint) {
        return false;
    }

    annotations.insert(CONFIG_HASH_ANNOTATION.to_string(), fingerprint.to_string());
    annotations.insert(
        CONFIG_UPDATED_ANNOTATION.to_string(),
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    true
}

/// Check one release; returns the number of workloads updated.
pub async fn sync_release(
    store: &dyn ClusterStore,
    namespace: &str,
    release: &str,
    now: DateTime<Utc>,
) -> Result<usize, ControllerError> {
    let selector = format!("{INSTANCE_LABEL}={release}");
    let config_maps = store.list_config_maps(namespace, &selector).await?;
    let secrets = store.list_secrets(namespace, &selector).await?;
    if config_maps.is_empty() && secrets.is_empty() {
        debug!("No configuration objects for release {}/{}", namespace, release);
        return Ok(0);
    }

    let fingerprint = config_fingerprint(&config_maps, &secrets);
    let mut updated = 0;
    for mut workload in store.list_workloads(namespace, &selector).await? {
        let Some(template) = workload.pod_template_mut() else {
            continue;
        };
        if !stamp_pod_template(template, &fingerprint, now) {
            continue;
        }

        match store.replace_workload(namespace, &workload).await {
            Ok(()) => {
                info!(
                    "Configuration of release {}/{} changed (hash {}), restarting {} {}",
                    namespace,
                    release,
                    fingerprint,
                    workload.kind(),
                    workload.name()
                );
                updated += 1;
            }
            Err(e) => error!(
                "Failed to update {} {}/{}: {}",
                workload.kind(),
                namespace,
                workload.name(),
                e
            ),
        }
    }
    Ok(updated)
}

/// Check every release of a stack; returns the number of workloads updated.
///
/// All releases are checked even when one fails; the failures are reported
/// together.
pub async fn sync_stack(
    store: &dyn ClusterStore,
    namespace: &str,
    stack_name: &str,
    now: DateTime<Utc>,
) -> Result<usize, ControllerError> {
    let mut updated = 0;
    let mut failures = Vec::new();
    for component in Component::ALL {
        let release = component.release_name(stack_name);
        match sync_release(store, namespace, &release, now).await {
            Ok(count) => updated += count,
            Err(e) => {
                warn!("Drift check of release {}/{} failed: {}", namespace, release, e);
                failures.push(format!("{release}: {e}"));
            }
        }
    }

    if failures.is_empty() {
        Ok(updated)
    } else {
        Err(ControllerError::DriftScan(failures.join("; ")))
    }
}

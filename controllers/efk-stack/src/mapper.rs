//! Maps ConfigMap and Secret events to the EFKStack that owns them.
//!
//! Objects rendered by a release carry the `app.kubernetes.io/instance`
//! label set to the release name. Objects without the label are matched by
//! name prefix, which also covers `<release>-config` and
//! `<release>-<name>-config`.

use std::sync::Arc;

use crds::{Component, EFKStack, INSTANCE_LABEL};
use kube::ResourceExt;
use kube_runtime::reflector::ObjectRef;

/// The EFKStack whose release produced `obj`, if any.
///
/// `stacks` may span namespaces; only stacks in the object's namespace are
/// considered and the first match wins.
pub fn owning_stack<K: ResourceExt>(obj: &K, stacks: &[Arc<EFKStack>]) -> Option<ObjectRef<EFKStack>> {
    let namespace = obj.namespace().unwrap_or_default();
    let instance = obj
        .labels()
        .get(INSTANCE_LABEL)
        .filter(|value| !value.is_empty());
    let name = obj.name_any();

    stacks
        .iter()
        .filter(|stack| stack.namespace().unwrap_or_default() == namespace)
        .find(|stack| {
            let stack_name = stack.name_any();
            Component::ALL.into_iter().any(|component| {
                let release = component.release_name(&stack_name);
                match instance {
                    Some(instance) => *instance == release,
                    None => name.starts_with(&release),
                }
            })
        })
        .map(|stack| ObjectRef::new(&stack.name_any()).within(&namespace))
}

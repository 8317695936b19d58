//! Helm values for each component release.
//!
//! Pure translation from the EFKStack spec to the value tree each chart
//! expects. Optional sections are left out entirely when unset so that chart
//! defaults apply.

use std::collections::BTreeMap;

use crds::{
    Component, EFKStackSpec, GlobalSpec, IngressSpec, ResourceList, ResourceSpec, Toleration,
};
use serde_json::{json, Map, Value};

/// Port the search engine serves HTTP on.
pub const SEARCH_ENGINE_PORT: u16 = 9200;

/// Index the log shipper writes to.
const LOG_SHIPPER_INDEX: &str = "fluent-bit";

/// Annotation promoted to `className` on the dashboard ingress.
const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Taint effects tolerated by components that run on every node.
const DEFAULT_TOLERATED_EFFECTS: [&str; 3] = ["NoSchedule", "NoExecute", "PreferNoSchedule"];

/// Values for `component` of the stack named `stack_name`.
#[must_use]
pub fn release_values(component: Component, stack_name: &str, spec: &EFKStackSpec) -> Value {
    match component {
        Component::SearchEngine => search_engine_values(spec),
        Component::LogShipper => log_shipper_values(stack_name, spec),
        Component::Dashboard => dashboard_values(stack_name, spec),
    }
}

/// In-cluster HTTP endpoint of the stack's search engine.
#[must_use]
pub fn search_engine_url(stack_name: &str) -> String {
    format!(
        "http://{}:{}",
        Component::SearchEngine.release_name(stack_name),
        SEARCH_ENGINE_PORT
    )
}

fn search_engine_values(spec: &EFKStackSpec) -> Value {
    let engine = &spec.search_engine;
    let mut values = Map::new();
    values.insert("version".into(), json!(engine.version));
    values.insert("mode".into(), json!(engine.mode.as_str()));
    values.insert("replicas".into(), json!(engine.effective_replicas()));
    values.insert("resources".into(), resources(&engine.resources));

    let mut storage = Map::new();
    let storage_class = engine
        .storage
        .storage_class_name
        .as_ref()
        .or(spec.global.storage_class.as_ref());
    insert_opt(&mut storage, "storageClassName", storage_class);
    insert_opt(&mut storage, "size", engine.storage.size.as_ref());
    insert_opt(&mut storage, "volumeType", engine.storage.volume_type.as_ref());
    insert_opt(&mut storage, "path", engine.storage.path.as_ref());
    values.insert("storage".into(), Value::Object(storage));

    let security = &engine.security;
    let mut security_values = Map::new();
    security_values.insert("tlsEnabled".into(), json!(security.tls_enabled));
    security_values.insert("authEnabled".into(), json!(security.auth_enabled));
    insert_opt(&mut security_values, "tlsSecretName", security.tls_secret_name.as_ref());
    insert_opt(&mut security_values, "authSecretName", security.auth_secret_name.as_ref());
    values.insert("security".into(), Value::Object(security_values));

    if !engine.config.is_empty() {
        values.insert("config".into(), json!(engine.config));
    }

    placement(&mut values, &engine.node_selector, &engine.tolerations, false);
    global(&mut values, &spec.global);
    Value::Object(values)
}

fn log_shipper_values(stack_name: &str, spec: &EFKStackSpec) -> Value {
    let shipper = &spec.log_shipper;
    let mut values = Map::new();
    values.insert("version".into(), json!(shipper.version));
    if let Some(replicas) = shipper.replicas {
        values.insert("replicas".into(), json!(replicas));
    }
    values.insert("resources".into(), resources(&shipper.resources));
    values.insert(
        "elasticsearch".into(),
        json!({
            "host": Component::SearchEngine.release_name(stack_name),
            "port": SEARCH_ENGINE_PORT,
            "index": LOG_SHIPPER_INDEX,
        }),
    );

    let mut config = Map::new();
    insert_opt(&mut config, "input", shipper.config.input.as_ref());
    insert_opt(&mut config, "filter", shipper.config.filter.as_ref());
    insert_opt(&mut config, "output", shipper.config.output.as_ref());
    insert_opt(&mut config, "service", shipper.config.service.as_ref());
    if !config.is_empty() {
        values.insert("config".into(), Value::Object(config));
    }

    // Without a fixed replica count the shipper runs on every node.
    let every_node = shipper.replicas.is_none();
    placement(&mut values, &shipper.node_selector, &shipper.tolerations, every_node);
    global(&mut values, &spec.global);
    Value::Object(values)
}

fn dashboard_values(stack_name: &str, spec: &EFKStackSpec) -> Value {
    let dashboard = &spec.dashboard;
    let mut values = Map::new();
    values.insert("version".into(), json!(dashboard.version));
    values.insert("replicas".into(), json!(dashboard.replicas));
    values.insert("resources".into(), resources(&dashboard.resources));
    values.insert(
        "elasticsearch".into(),
        json!({ "hosts": [search_engine_url(stack_name)] }),
    );

    if dashboard.ingress.enabled {
        values.insert("ingress".into(), ingress(&dashboard.ingress));
    }

    placement(&mut values, &dashboard.node_selector, &dashboard.tolerations, false);
    global(&mut values, &spec.global);
    Value::Object(values)
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        map.insert(key.to_string(), json!(value));
    }
}

fn quantities(list: &ResourceList) -> Value {
    let mut map = Map::new();
    insert_opt(&mut map, "cpu", list.cpu.as_ref());
    insert_opt(&mut map, "memory", list.memory.as_ref());
    Value::Object(map)
}

fn resources(spec: &ResourceSpec) -> Value {
    let mut map = Map::new();
    if !spec.requests.is_empty() {
        map.insert("requests".into(), quantities(&spec.requests));
    }
    if !spec.limits.is_empty() {
        map.insert("limits".into(), quantities(&spec.limits));
    }
    Value::Object(map)
}

fn toleration(toleration: &Toleration) -> Value {
    let mut map = Map::new();
    insert_opt(&mut map, "key", toleration.key.as_ref());
    insert_opt(&mut map, "operator", toleration.operator.as_ref());
    insert_opt(&mut map, "value", toleration.value.as_ref());
    insert_opt(&mut map, "effect", toleration.effect.as_ref());
    if let Some(seconds) = toleration.toleration_seconds {
        map.insert("tolerationSeconds".into(), json!(seconds));
    }
    Value::Object(map)
}

/// Default tolerations for components scheduled onto every node.
#[must_use]
pub fn default_tolerations() -> Vec<Toleration> {
    DEFAULT_TOLERATED_EFFECTS
        .iter()
        .map(|effect| Toleration::exists(effect))
        .collect()
}

fn placement(
    values: &mut Map<String, Value>,
    node_selector: &BTreeMap<String, String>,
    tolerations: &[Toleration],
    every_node: bool,
) {
    if !node_selector.is_empty() {
        values.insert("nodeSelector".into(), json!(node_selector));
    }

    let defaults;
    let tolerations = if tolerations.is_empty() && every_node {
        defaults = default_tolerations();
        defaults.as_slice()
    } else {
        tolerations
    };
    if !tolerations.is_empty() {
        values.insert(
            "tolerations".into(),
            Value::Array(tolerations.iter().map(toleration).collect()),
        );
    }
}

fn global(values: &mut Map<String, Value>, global: &GlobalSpec) {
    let mut map = Map::new();
    insert_opt(&mut map, "imageRegistry", global.image_registry.as_ref());
    if global.tls.enabled {
        let mut tls = Map::new();
        tls.insert("enabled".into(), json!(true));
        insert_opt(&mut tls, "secretName", global.tls.secret_name.as_ref());
        map.insert("tls".into(), Value::Object(tls));
    }
    if !map.is_empty() {
        values.insert("global".into(), Value::Object(map));
    }
}

fn ingress(spec: &IngressSpec) -> Value {
    let mut map = Map::new();
    map.insert("enabled".into(), json!(true));
    map.insert(
        "hosts".into(),
        json!([{
            "host": spec.host.clone().unwrap_or_default(),
            "paths": [{ "path": "/", "pathType": "Prefix" }],
        }]),
    );

    if !spec.annotations.is_empty() {
        map.insert("annotations".into(), json!(spec.annotations));
    }
    if let Some(class) = spec.annotations.get(INGRESS_CLASS_ANNOTATION) {
        map.insert("className".into(), json!(class));
    }

    if !spec.tls.is_empty() {
        let tls: Vec<Value> = spec
            .tls
            .iter()
            .map(|entry| {
                let mut tls = Map::new();
                tls.insert("hosts".into(), json!(entry.hosts));
                insert_opt(&mut tls, "secretName", entry.secret_name.as_ref());
                Value::Object(tls)
            })
            .collect();
        map.insert("tls".into(), Value::Array(tls));
    }
    Value::Object(map)
}

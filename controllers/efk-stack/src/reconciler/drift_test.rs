//! Unit tests for configuration drift detection

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use k8s_openapi::api::core::v1::PodTemplateSpec;

    use crate::error::ControllerError;
    use crate::reconciler::drift::*;
    use crate::store::Workload;
    use crate::test_utils::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid timestamp")
    }

    fn template_annotation(workload: &Workload, key: &str) -> Option<String> {
        let mut workload = workload.clone();
        workload
            .pod_template_mut()
            .and_then(|t| t.metadata.as_ref())
            .and_then(|m| m.annotations.as_ref())
            .and_then(|a| a.get(key).cloned())
    }

    #[test]
    fn test_fingerprint_is_stable_and_order_independent() {
        let a = config_map("logs-a", "logging", None, &[("x", "1"), ("y", "2")]);
        let b = config_map("logs-b", "logging", None, &[("z", "3")]);
        let s = secret("logs-creds", "logging", None, &[("password", "hunter2")]);

        let first = config_fingerprint(&[a.clone(), b.clone()], &[s.clone()]);
        let second = config_fingerprint(&[b, a], &[s]);

        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_any_value() {
        let base = config_fingerprint(
            &[config_map("logs-a", "logging", None, &[("x", "1")])],
            &[secret("logs-creds", "logging", None, &[("password", "a")])],
        );
        let changed_config = config_fingerprint(
            &[config_map("logs-a", "logging", None, &[("x", "2")])],
            &[secret("logs-creds", "logging", None, &[("password", "a")])],
        );
        let changed_secret = config_fingerprint(
            &[config_map("logs-a", "logging", None, &[("x", "1")])],
            &[secret("logs-creds", "logging", None, &[("password", "b")])],
        );

        assert_ne!(base, changed_config);
        assert_ne!(base, changed_secret);
        assert_ne!(changed_config, changed_secret);
    }

    #[test]
    fn test_fingerprint_covers_binary_data() {
        let before = config_fingerprint(
            &[binary_config_map("logs-certs", "logging", None, &[("ca.der", &[1u8, 2][..])])],
            &[],
        );
        let after = config_fingerprint(
            &[binary_config_map("logs-certs", "logging", None, &[("ca.der", &[1u8, 3][..])])],
            &[],
        );
        assert_ne!(before, after);
    }

    #[test]
    fn test_field_boundaries_matter() {
        let joined = config_fingerprint(&[config_map("logs", "logging", None, &[("ab", "c")])], &[]);
        let split = config_fingerprint(&[config_map("logs", "logging", None, &[("a", "bc")])], &[]);
        assert_ne!(joined, split);
    }

    #[test]
    fn test_stamp_only_when_hash_differs() {
        let mut template = PodTemplateSpec::default();

        assert!(stamp_pod_template(&mut template, "0123456789abcdef", now()));
        assert!(!stamp_pod_template(&mut template, "0123456789abcdef", now()));
        assert!(stamp_pod_template(&mut template, "fedcba9876543210", now()));

        let annotations = template
            .metadata
            .and_then(|m| m.annotations)
            .expect("annotations");
        assert_eq!(annotations[CONFIG_HASH_ANNOTATION], "fedcba9876543210");
        assert_eq!(annotations[CONFIG_UPDATED_ANNOTATION], "2024-05-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_release_without_config_is_skipped() {
        let store = MockClusterStore::new();
        store.add_workload(deployment("logs-dashboard", "logging", "logs-dashboard"));

        let updated = sync_release(&store, "logging", "logs-dashboard", now())
            .await
            .expect("sync");

        assert_eq!(updated, 0);
        assert!(store.replaced().is_empty());
    }

    #[tokio::test]
    async fn test_restart_written_once_per_change() {
        let store = MockClusterStore::new();
        store.add_config_map(config_map(
            "logs-searchengine-config",
            "logging",
            Some("logs-searchengine"),
            &[("elasticsearch.yml", "cluster.name: logs")],
        ));
        store.add_workload(stateful_set("logs-searchengine", "logging", "logs-searchengine"));
        store.add_workload(deployment("logs-searchengine-exporter", "logging", "logs-searchengine"));
        // Another release's workload is never touched.
        store.add_workload(daemon_set("logs-logshipper", "logging", "logs-logshipper"));

        let first = sync_release(&store, "logging", "logs-searchengine", now()).await.expect("sync");
        assert_eq!(first, 2);

        let second = sync_release(&store, "logging", "logs-searchengine", now()).await.expect("sync");
        assert_eq!(second, 0);

        store.update_config_map("logs-searchengine-config", &[("elasticsearch.yml", "cluster.name: audit")]);
        let third = sync_release(&store, "logging", "logs-searchengine", now()).await.expect("sync");
        assert_eq!(third, 2);

        assert_eq!(
            store.replaced(),
            vec![
                "StatefulSet/logs-searchengine",
                "Deployment/logs-searchengine-exporter",
                "StatefulSet/logs-searchengine",
                "Deployment/logs-searchengine-exporter",
            ]
        );
        let shipper = store.workload("logs-logshipper").expect("workload");
        assert_eq!(template_annotation(&shipper, CONFIG_HASH_ANNOTATION), None);

        let engine = store.workload("logs-searchengine").expect("workload");
        assert!(template_annotation(&engine, CONFIG_HASH_ANNOTATION).is_some());
        assert!(template_annotation(&engine, CONFIG_UPDATED_ANNOTATION).is_some());
    }

    #[tokio::test]
    async fn test_binary_only_config_map_triggers_restart() {
        let store = MockClusterStore::new();
        store.add_config_map(binary_config_map(
            "logs-logshipper-parsers",
            "logging",
            Some("logs-logshipper"),
            &[("parsers.bin", &[0xde_u8, 0xad][..])],
        ));
        store.add_workload(daemon_set("logs-logshipper", "logging", "logs-logshipper"));

        assert_eq!(sync_release(&store, "logging", "logs-logshipper", now()).await.expect("sync"), 1);
        assert_eq!(sync_release(&store, "logging", "logs-logshipper", now()).await.expect("sync"), 0);

        store.update_config_map_binary("logs-logshipper-parsers", &[("parsers.bin", &[0xde_u8, 0xae][..])]);
        assert_eq!(sync_release(&store, "logging", "logs-logshipper", now()).await.expect("sync"), 1);
        assert_eq!(store.replaced(), vec!["DaemonSet/logs-logshipper", "DaemonSet/logs-logshipper"]);
    }

    #[tokio::test]
    async fn test_secret_only_release_is_checked() {
        let store = MockClusterStore::new();
        store.add_secret(secret("logs-dashboard-auth", "logging", Some("logs-dashboard"), &[("token", "t")]));
        store.add_workload(deployment("logs-dashboard", "logging", "logs-dashboard"));

        let updated = sync_release(&store, "logging", "logs-dashboard", now()).await.expect("sync");
        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn test_failed_update_continues_scan() {
        let store = MockClusterStore::new();
        store.add_config_map(config_map("logs-dashboard-config", "logging", Some("logs-dashboard"), &[("k", "v")]));
        store.add_workload(deployment("logs-dashboard", "logging", "logs-dashboard"));
        store.fail_workload_replace(true);

        let updated = sync_release(&store, "logging", "logs-dashboard", now()).await.expect("sync");
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn test_list_failure_reported_for_stack() {
        let store = MockClusterStore::new();
        store.fail_config_map_list(true);

        let err = sync_release(&store, "logging", "logs-searchengine", now())
            .await
            .expect_err("list failure propagates");
        assert!(matches!(err, ControllerError::Store(_)));

        let err = sync_stack(&store, "logging", "logs", now())
            .await
            .expect_err("scan failure reported");
        match err {
            ControllerError::DriftScan(message) => {
                assert!(message.contains("logs-searchengine"));
                assert!(message.contains("logs-dashboard"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

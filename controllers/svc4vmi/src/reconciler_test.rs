//! Unit tests for the Service reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::{Mutation, ReconcileOutcome, Reconciler};
    use crate::test_utils::*;
    use cluster_client::{MockClusterClient, MockOperation, ObjectKey, Scheme};
    use k8s_openapi::api::core::v1::Service;
    use kubevirt_types::SERVICE_LABEL;
    use std::sync::Arc;

    fn reconciler(client: &MockClusterClient) -> Reconciler<MockClusterClient> {
        Reconciler::new(
            Arc::new(client.clone()),
            Arc::new(test_scheme()),
            tracing::Span::none(),
        )
    }

    fn vm1_key() -> ObjectKey {
        ObjectKey::new("default", "vm1")
    }

    fn outcome(mutation: Mutation) -> ReconcileOutcome {
        ReconcileOutcome {
            requeue: false,
            mutation,
        }
    }

    fn selector_of(svc: &Service) -> Option<String> {
        svc.spec
            .as_ref()?
            .selector
            .as_ref()?
            .get("kubevirt.io/created-by")
            .cloned()
    }

    #[tokio::test]
    async fn test_labelled_vmi_gets_service() {
        let client = MockClusterClient::new();
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));

        let result = reconciler(&client).reconcile(&vm1_key()).await.expect("reconcile");
        assert_eq!(result, outcome(Mutation::Created));

        let svc = client.service(&vm1_key()).expect("Service created");
        assert_eq!(selector_of(&svc).as_deref(), Some("abc"));
        let spec = svc.spec.as_ref().expect("spec");
        assert_eq!(spec.type_.as_deref(), Some("NodePort"));
        let port = &spec.ports.as_ref().expect("ports")[0];
        assert_eq!((port.name.as_deref(), port.protocol.as_deref(), port.port), (Some("ssh"), Some("TCP"), 22));
        let owner = &svc.metadata.owner_references.as_ref().expect("owner references")[0];
        assert_eq!(owner.kind, "VirtualMachineInstance");
        assert_eq!(owner.name, "vm1");
        assert_eq!(owner.controller, Some(true));
    }

    #[tokio::test]
    async fn test_label_removal_deletes_service() {
        let client = MockClusterClient::new();
        let reconciler = reconciler(&client);
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        reconciler.reconcile(&vm1_key()).await.expect("create");
        assert_eq!(client.service_count(), 1);

        client.add_virtual_machine_instance(create_test_vmi("default", "vm1", "abc", &[]));
        let result = reconciler.reconcile(&vm1_key()).await.expect("delete");
        assert_eq!(result, outcome(Mutation::Deleted));
        assert_eq!(client.service_count(), 0);
    }

    #[tokio::test]
    async fn test_label_set_to_other_value_deletes_service() {
        let client = MockClusterClient::new();
        let reconciler = reconciler(&client);
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        reconciler.reconcile(&vm1_key()).await.expect("create");

        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "false")],
        ));
        reconciler.reconcile(&vm1_key()).await.expect("delete");
        assert!(client.service(&vm1_key()).is_none());
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let client = MockClusterClient::new();
        let reconciler = reconciler(&client);
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));

        reconciler.reconcile(&vm1_key()).await.expect("first");
        let after_first = client.service(&vm1_key());
        let second = reconciler.reconcile(&vm1_key()).await.expect("second");

        assert_eq!(second, outcome(Mutation::None));
        assert_eq!(client.service(&vm1_key()), after_first);
        assert_eq!(client.calls(MockOperation::CreateService), 1);

        // Opted-out VMI: nothing to create on either pass
        let key = ObjectKey::new("default", "vm2");
        client.add_virtual_machine_instance(create_test_vmi("default", "vm2", "def", &[]));
        reconciler.reconcile(&key).await.expect("first");
        reconciler.reconcile(&key).await.expect("second");
        assert!(client.service(&key).is_none());
        assert_eq!(client.calls(MockOperation::CreateService), 1);
        assert_eq!(client.calls(MockOperation::DeleteService), 0);
    }

    #[tokio::test]
    async fn test_unlabelled_vmi_without_service_is_noop() {
        let client = MockClusterClient::new();
        client.add_virtual_machine_instance(create_test_vmi("default", "vm1", "abc", &[]));

        let result = reconciler(&client).reconcile(&vm1_key()).await.expect("reconcile");
        assert_eq!(result, outcome(Mutation::None));
        assert_eq!(client.service_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_vmi_is_absorbed() {
        let client = MockClusterClient::new();
        // Stale Service left behind; garbage collection owns its removal
        client.add_service(create_test_service(
            "default",
            "vm1",
            &[vmi_owner_reference("vm1", "abc")],
        ));

        let result = reconciler(&client).reconcile(&vm1_key()).await.expect("reconcile");
        assert_eq!(result, outcome(Mutation::None));
        assert_eq!(client.service_count(), 1);
        assert_eq!(client.calls(MockOperation::GetService), 0);
        assert_eq!(client.calls(MockOperation::DeleteService), 0);
    }

    #[tokio::test]
    async fn test_vmi_deleted_after_service_created() {
        let client = MockClusterClient::new();
        let reconciler = reconciler(&client);
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        reconciler.reconcile(&vm1_key()).await.expect("create");
        client.remove_virtual_machine_instance(&vm1_key()).expect("VMI stored");

        let result = reconciler.reconcile(&vm1_key()).await.expect("reconcile");
        assert_eq!(result, outcome(Mutation::None));
        // Left for garbage collection
        assert_eq!(client.service_count(), 1);
        assert_eq!(client.calls(MockOperation::DeleteService), 0);
    }

    #[tokio::test]
    async fn test_foreign_service_is_never_deleted() {
        let client = MockClusterClient::new();
        let reconciler = reconciler(&client);
        // Same namespace/name, but controlled by a different VMI name
        client.add_service(create_test_service(
            "default",
            "vm1",
            &[vmi_owner_reference("other-vm", "abc")],
        ));

        for labels in [&[(SERVICE_LABEL, "true")][..], &[(SERVICE_LABEL, "false")][..], &[][..]] {
            client.add_virtual_machine_instance(create_test_vmi("default", "vm1", "abc", labels));
            let result = reconciler.reconcile(&vm1_key()).await.expect("reconcile");
            assert_eq!(result, outcome(Mutation::None));
        }
        assert_eq!(client.service_count(), 1);
        assert_eq!(client.calls(MockOperation::DeleteService), 0);
        assert_eq!(client.calls(MockOperation::CreateService), 0);
    }

    #[tokio::test]
    async fn test_unowned_service_is_never_deleted() {
        let client = MockClusterClient::new();
        client.add_service(create_test_service("default", "vm1", &[]));
        client.add_virtual_machine_instance(create_test_vmi("default", "vm1", "abc", &[]));

        let result = reconciler(&client).reconcile(&vm1_key()).await.expect("reconcile");
        assert_eq!(result, outcome(Mutation::None));
        assert_eq!(client.service_count(), 1);
    }

    #[tokio::test]
    async fn test_service_of_recreated_vmi_is_still_owned() {
        let client = MockClusterClient::new();
        client.add_service(create_test_service(
            "default",
            "vm1",
            &[vmi_owner_reference("vm1", "uid-of-previous-vmi")],
        ));
        client.add_virtual_machine_instance(create_test_vmi("default", "vm1", "abc", &[]));

        let result = reconciler(&client).reconcile(&vm1_key()).await.expect("reconcile");
        assert_eq!(result, outcome(Mutation::Deleted));
        assert_eq!(client.service_count(), 0);
    }

    #[tokio::test]
    async fn test_externally_deleted_service_is_recreated() {
        let client = MockClusterClient::new();
        let reconciler = reconciler(&client);
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        reconciler.reconcile(&vm1_key()).await.expect("create");
        client.remove_service(&vm1_key());

        let result = reconciler.reconcile(&vm1_key()).await.expect("recreate");
        assert_eq!(result, outcome(Mutation::Created));
        assert_eq!(client.service_count(), 1);
    }

    #[tokio::test]
    async fn test_vmi_fetch_error_is_propagated() {
        let client = MockClusterClient::new();
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        client.fail_next(MockOperation::GetVirtualMachineInstance, "connection reset");

        let err = reconciler(&client).reconcile(&vm1_key()).await.expect_err("fetch fails");
        assert!(matches!(err, ControllerError::Client(_)));
        assert!(!err.is_not_found());
        assert_eq!(client.service_count(), 0);
    }

    #[tokio::test]
    async fn test_service_fetch_error_is_propagated() {
        let client = MockClusterClient::new();
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        client.fail_next(MockOperation::GetService, "throttled");

        let err = reconciler(&client).reconcile(&vm1_key()).await.expect_err("fetch fails");
        assert!(err.to_string().contains("throttled"));
        assert_eq!(client.calls(MockOperation::CreateService), 0);
    }

    #[tokio::test]
    async fn test_create_error_is_propagated_then_retry_converges() {
        let client = MockClusterClient::new();
        let reconciler = reconciler(&client);
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        client.fail_next(MockOperation::CreateService, "admission webhook unavailable");

        reconciler.reconcile(&vm1_key()).await.expect_err("create fails");
        assert_eq!(client.service_count(), 0);

        let result = reconciler.reconcile(&vm1_key()).await.expect("retry");
        assert_eq!(result, outcome(Mutation::Created));
        assert_eq!(client.service_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_error_is_propagated() {
        let client = MockClusterClient::new();
        client.add_service(create_test_service(
            "default",
            "vm1",
            &[vmi_owner_reference("vm1", "abc")],
        ));
        client.add_virtual_machine_instance(create_test_vmi("default", "vm1", "abc", &[]));
        client.fail_next(MockOperation::DeleteService, "conflict");

        reconciler(&client).reconcile(&vm1_key()).await.expect_err("delete fails");
        assert_eq!(client.service_count(), 1);
    }

    #[tokio::test]
    async fn test_scheme_error_is_surfaced() {
        let client = MockClusterClient::new();
        client.add_virtual_machine_instance(create_test_vmi(
            "default",
            "vm1",
            "abc",
            &[(SERVICE_LABEL, "true")],
        ));
        let reconciler = Reconciler::new(
            Arc::new(client.clone()),
            Arc::new(Scheme::new()),
            tracing::Span::none(),
        );

        let err = reconciler.reconcile(&vm1_key()).await.expect_err("unregistered type");
        assert!(matches!(err, ControllerError::Scheme(_)));
        assert_eq!(client.service_count(), 0);
    }
}

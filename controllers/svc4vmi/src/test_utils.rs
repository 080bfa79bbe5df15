//! Test utilities for unit testing the controller
//!
//! Builders for VMIs, Services and owner references.

use cluster_client::Scheme;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kubevirt_types::VirtualMachineInstance;
use std::collections::BTreeMap;

/// Scheme with the two kinds the controller handles
pub fn test_scheme() -> Scheme {
    Scheme::new()
        .with::<VirtualMachineInstance>()
        .with::<Service>()
}

/// Helper to create a test VirtualMachineInstance
pub fn create_test_vmi(
    namespace: &str,
    name: &str,
    uid: &str,
    labels: &[(&str, &str)],
) -> VirtualMachineInstance {
    let labels: BTreeMap<String, String> = labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    VirtualMachineInstance {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(uid.to_string()),
            labels: (!labels.is_empty()).then_some(labels),
            ..Default::default()
        },
        spec: Default::default(),
        status: None,
    }
}

/// Helper to create a test Service with the given owner references
pub fn create_test_service(namespace: &str, name: &str, owners: &[OwnerReference]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: (!owners.is_empty()).then(|| owners.to_vec()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Controller owner reference
pub fn owner_reference(api_version: &str, kind: &str, name: &str, uid: &str) -> OwnerReference {
    OwnerReference {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
        uid: uid.to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Controller owner reference to a VirtualMachineInstance
pub fn vmi_owner_reference(name: &str, uid: &str) -> OwnerReference {
    owner_reference("kubevirt.io/v1", "VirtualMachineInstance", name, uid)
}

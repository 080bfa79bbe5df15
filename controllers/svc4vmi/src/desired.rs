//! Desired Service for a VirtualMachineInstance.

use crate::error::ControllerError;
use crate::ownership::controller_reference;
use cluster_client::Scheme;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kubevirt_types::{CREATED_BY_LABEL, VirtualMachineInstance};
use std::collections::BTreeMap;

/// Name of the single exposed port
pub const SSH_PORT_NAME: &str = "ssh";
/// Port exposed on the Service
pub const SSH_PORT: i32 = 22;
/// Protocol of the exposed port
pub const SSH_PROTOCOL: &str = "TCP";
/// Reachable from outside the cluster on every node
pub const SERVICE_TYPE: &str = "NodePort";

/// Builds the Service that should exist for `vmi`.
///
/// The Service has the VMI's namespace and name, selects the virt-launcher pod
/// through `kubevirt.io/created-by=<uid>`, and is controlled by the VMI so the
/// API server garbage collects it with the VMI.
pub fn build_desired(vmi: &VirtualMachineInstance, scheme: &Scheme) -> Result<Service, ControllerError> {
    let name = vmi.metadata.name.clone().ok_or_else(|| {
        ControllerError::InvalidObject("VirtualMachineInstance missing name".to_string())
    })?;
    let namespace = vmi.metadata.namespace.clone().ok_or_else(|| {
        ControllerError::InvalidObject(format!("VirtualMachineInstance {name} missing namespace"))
    })?;
    let uid = vmi.metadata.uid.clone().ok_or_else(|| {
        ControllerError::InvalidObject(format!("VirtualMachineInstance {namespace}/{name} missing uid"))
    })?;

    let gvk = scheme.resolve_object(vmi)?;
    let owner = controller_reference(&gvk, vmi);

    Ok(Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace),
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some(SSH_PORT_NAME.to_string()),
                protocol: Some(SSH_PROTOCOL.to_string()),
                port: SSH_PORT,
                ..ServicePort::default()
            }]),
            selector: Some(BTreeMap::from([(CREATED_BY_LABEL.to_string(), uid)])),
            type_: Some(SERVICE_TYPE.to_string()),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    })
}

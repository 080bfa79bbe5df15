//! VirtualMachineInstance
//!
//! A running KubeVirt virtual machine. Only metadata is interpreted by the
//! controller; spec and status are carried through untouched.

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// VirtualMachineInstanceSpec defines the desired state of a VirtualMachineInstance
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "kubevirt.io",
    version = "v1",
    kind = "VirtualMachineInstance",
    plural = "virtualmachineinstances",
    shortname = "vmi",
    namespaced,
    status = "VirtualMachineInstanceStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInstanceSpec {
    /// Domain definition (CPU, memory, devices)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<serde_json::Value>,

    /// Node selector for the virt-launcher pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    /// Remaining KubeVirt fields, preserved verbatim
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// VirtualMachineInstanceStatus defines the observed state of a VirtualMachineInstance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInstanceStatus {
    /// Lifecycle phase (Pending, Scheduling, Scheduled, Running, Succeeded, Failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Node the VMI is running on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Remaining status fields, preserved verbatim
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

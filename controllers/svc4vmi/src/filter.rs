//! Event filters.
//!
//! Decide whether a watch event should turn into a reconcile request.
//! The reconciler re-reads everything it needs, so these only have to
//! catch the transitions that can change the desired state.

use k8s_openapi::api::core::v1::Service;
use kubevirt_types::{SERVICE_LABEL, SERVICE_LABEL_ENABLED, VirtualMachineInstance};

/// A change to a single object of type `K`.
#[derive(Debug)]
pub enum ResourceEvent<'a, K> {
    /// First sighting of the object
    Create(&'a K),
    /// The object changed from `old` to `new`
    Update {
        /// Previously observed version
        old: &'a K,
        /// Current version
        new: &'a K,
    },
    /// The object is gone
    Delete(&'a K),
}

/// Whether the VMI opts in to a managed Service.
///
/// Only the exact value `"true"` counts; any other value or a missing label is opt-out.
pub fn has_svc_label(vmi: &VirtualMachineInstance) -> bool {
    vmi.metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(SERVICE_LABEL))
        .is_some_and(|value| value == SERVICE_LABEL_ENABLED)
}

/// Filter for VirtualMachineInstance events.
///
/// Creates always enqueue. Updates enqueue only when the opt-in flag flips.
/// Deletes never enqueue: the owned Service is garbage collected by the API
/// server through its owner reference.
pub fn primary_should_enqueue(event: &ResourceEvent<'_, VirtualMachineInstance>) -> bool {
    match event {
        ResourceEvent::Create(_) => true,
        ResourceEvent::Update { old, new } => has_svc_label(old) != has_svc_label(new),
        ResourceEvent::Delete(_) => false,
    }
}

/// Filter for Service events.
///
/// Only deletes enqueue, so an externally removed Service is recreated. Our own
/// creates would otherwise trigger a reconcile each.
pub fn secondary_should_enqueue(event: &ResourceEvent<'_, Service>) -> bool {
    matches!(event, ResourceEvent::Delete(_))
}

//! ClusterClient trait for mocking
//!
//! Abstracts the handful of API calls the controller makes so reconcile logic
//! can be unit tested against an in-memory store.

use crate::error::ClientError;
use crate::key::ObjectKey;
use k8s_openapi::api::core::v1::Service;
use kubevirt_types::VirtualMachineInstance;

/// Point reads and single-object mutations against the cluster.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Reads return [`ClientError::NotFound`] when the object is absent; every other
/// failure is surfaced unchanged so the caller can requeue.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Fetch a VirtualMachineInstance by namespace/name
    async fn get_virtual_machine_instance(
        &self,
        key: &ObjectKey,
    ) -> Result<VirtualMachineInstance, ClientError>;

    /// Fetch a Service by namespace/name
    async fn get_service(&self, key: &ObjectKey) -> Result<Service, ClientError>;

    /// Create a Service; fails if one with the same name already exists
    async fn create_service(&self, service: &Service) -> Result<Service, ClientError>;

    /// Delete exactly the given Service (uid precondition when the uid is known)
    async fn delete_service(&self, service: &Service) -> Result<(), ClientError>;
}

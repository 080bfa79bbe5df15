//! Mock ClusterClient for unit testing
//!
//! In-memory implementation of [`ClusterClientTrait`] that behaves like the API
//! server for the calls the controller makes: uids are assigned on create,
//! creates conflict on existing names, deletes honour the uid precondition.
//! Failures can be injected per operation.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClientError;
use crate::key::ObjectKey;
use k8s_openapi::api::core::v1::Service;
use kubevirt_types::VirtualMachineInstance;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Operation a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// `get_virtual_machine_instance`
    GetVirtualMachineInstance,
    /// `get_service`
    GetService,
    /// `create_service`
    CreateService,
    /// `delete_service`
    DeleteService,
}

/// Mock ClusterClient for testing
#[derive(Debug, Clone, Default)]
pub struct MockClusterClient {
    pub(crate) vmis: Arc<Mutex<HashMap<ObjectKey, VirtualMachineInstance>>>,
    pub(crate) services: Arc<Mutex<HashMap<ObjectKey, Service>>>,
    // One-shot failures, consumed by the next call of the operation
    pub(crate) failures: Arc<Mutex<HashMap<MockOperation, String>>>,
    pub(crate) calls: Arc<Mutex<HashMap<MockOperation, usize>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key_of<K: kube::Resource>(obj: &K) -> Result<ObjectKey, ClientError> {
    ObjectKey::from_resource(obj).ok_or_else(|| {
        ClientError::InvalidRequest("object is missing namespace or name".to_string())
    })
}

impl MockClusterClient {
    /// Create a new, empty mock client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a VirtualMachineInstance (for test setup)
    ///
    /// # Panics
    /// If the VMI has no namespace or name.
    pub fn add_virtual_machine_instance(&self, vmi: VirtualMachineInstance) {
        let key = ObjectKey::from_resource(&vmi).expect("test VMI needs namespace and name");
        lock(&self.vmis).insert(key, vmi);
    }

    /// Remove a VirtualMachineInstance (simulates external deletion)
    pub fn remove_virtual_machine_instance(&self, key: &ObjectKey) -> Option<VirtualMachineInstance> {
        lock(&self.vmis).remove(key)
    }

    /// Add or replace a Service (for test setup); no uid is assigned
    ///
    /// # Panics
    /// If the Service has no namespace or name.
    pub fn add_service(&self, service: Service) {
        let key = ObjectKey::from_resource(&service).expect("test Service needs namespace and name");
        lock(&self.services).insert(key, service);
    }

    /// Remove a Service (simulates external deletion)
    pub fn remove_service(&self, key: &ObjectKey) -> Option<Service> {
        lock(&self.services).remove(key)
    }

    /// Current stored Service, if any
    #[must_use]
    pub fn service(&self, key: &ObjectKey) -> Option<Service> {
        lock(&self.services).get(key).cloned()
    }

    /// Number of stored Services
    #[must_use]
    pub fn service_count(&self) -> usize {
        lock(&self.services).len()
    }

    /// Make the next call of `operation` fail with an API error
    pub fn fail_next(&self, operation: MockOperation, message: impl Into<String>) {
        lock(&self.failures).insert(operation, message.into());
    }

    /// Number of calls made to `operation`, including failed ones
    #[must_use]
    pub fn calls(&self, operation: MockOperation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or(0)
    }

    fn enter(&self, operation: MockOperation) -> Result<(), ClientError> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        match lock(&self.failures).remove(&operation) {
            Some(message) => Err(ClientError::Api(message)),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_virtual_machine_instance(
        &self,
        key: &ObjectKey,
    ) -> Result<VirtualMachineInstance, ClientError> {
        self.enter(MockOperation::GetVirtualMachineInstance)?;
        lock(&self.vmis)
            .get(key)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                kind: "VirtualMachineInstance",
                key: key.clone(),
            })
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Service, ClientError> {
        self.enter(MockOperation::GetService)?;
        lock(&self.services)
            .get(key)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                kind: "Service",
                key: key.clone(),
            })
    }

    async fn create_service(&self, service: &Service) -> Result<Service, ClientError> {
        self.enter(MockOperation::CreateService)?;
        let key = key_of(service)?;
        let mut services = lock(&self.services);
        if services.contains_key(&key) {
            return Err(ClientError::Api(format!(
                "services \"{}\" already exists",
                key.name
            )));
        }
        let mut created = service.clone();
        created.metadata.uid = Some(Uuid::new_v4().to_string());
        services.insert(key, created.clone());
        Ok(created)
    }

    async fn delete_service(&self, service: &Service) -> Result<(), ClientError> {
        self.enter(MockOperation::DeleteService)?;
        let key = key_of(service)?;
        let mut services = lock(&self.services);
        let Some(stored) = services.get(&key) else {
            return Err(ClientError::NotFound {
                kind: "Service",
                key,
            });
        };
        if let Some(uid) = &service.metadata.uid {
            if stored.metadata.uid.as_ref() != Some(uid) {
                return Err(ClientError::Api(format!(
                    "precondition failed: uid in precondition {uid} does not match {}",
                    stored.metadata.uid.as_deref().unwrap_or("<none>")
                )));
            }
        }
        services.remove(&key);
        Ok(())
    }
}

//! Kubernetes API client
//!
//! Implements [`ClusterClientTrait`] over `kube::Api`, one namespaced handle per call.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClientError;
use crate::key::ObjectKey;
use k8s_openapi::api::core::v1::Service;
use kube::api::{DeleteParams, PostParams, Preconditions};
use kube::{Api, Client};
use kubevirt_types::VirtualMachineInstance;
use tracing::debug;

/// Cluster client backed by the API server
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Create a new client from an existing kube client
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn service_key(service: &Service) -> Result<ObjectKey, ClientError> {
        ObjectKey::from_resource(service).ok_or_else(|| {
            ClientError::InvalidRequest("Service is missing namespace or name".to_string())
        })
    }
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_virtual_machine_instance(
        &self,
        key: &ObjectKey,
    ) -> Result<VirtualMachineInstance, ClientError> {
        debug!("Fetching VirtualMachineInstance {}", key);
        let api: Api<VirtualMachineInstance> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name)
            .await?
            .ok_or_else(|| ClientError::NotFound {
                kind: "VirtualMachineInstance",
                key: key.clone(),
            })
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Service, ClientError> {
        debug!("Fetching Service {}", key);
        let api: Api<Service> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name)
            .await?
            .ok_or_else(|| ClientError::NotFound {
                kind: "Service",
                key: key.clone(),
            })
    }

    async fn create_service(&self, service: &Service) -> Result<Service, ClientError> {
        let key = Self::service_key(service)?;
        debug!("Creating Service {}", key);
        let api: Api<Service> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.create(&PostParams::default(), service).await?)
    }

    async fn delete_service(&self, service: &Service) -> Result<(), ClientError> {
        let key = Self::service_key(service)?;
        debug!("Deleting Service {}", key);
        let api: Api<Service> = Api::namespaced(self.client.clone(), &key.namespace);
        // Pin the uid so a Service recreated under the same name is left alone
        let params = DeleteParams {
            preconditions: service.metadata.uid.clone().map(|uid| Preconditions {
                uid: Some(uid),
                resource_version: None,
            }),
            ..DeleteParams::default()
        };
        api.delete(&key.name, &params).await?;
        Ok(())
    }
}

//! Controller-specific error types.
//!
//! This module defines error types specific to the svc4vmi controller
//! that are not covered by upstream library errors.

use cluster_client::{ClientError, SchemeError};
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the svc4vmi controller.
///
/// Every variant returned from a reconcile is retried by the error policy;
/// there is no separate fatal channel.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Fetch/create/delete against the cluster failed
    #[error("Cluster client error: {0}")]
    Client(#[from] ClientError),

    /// The primary type is not registered with the scheme
    #[error("Scheme resolution failed: {0}")]
    Scheme(#[from] SchemeError),

    /// Kubernetes client construction error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Object lacks metadata the controller relies on
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether the underlying cause is a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Client(e) if e.is_not_found())
    }
}

/// Reasons a Service is not considered controlled by a VirtualMachineInstance.
#[derive(Debug, Error)]
pub enum OwnershipError {
    /// The owner's kind could not be resolved
    #[error("Scheme resolution failed: {0}")]
    Scheme(#[from] SchemeError),

    /// No owner reference on the object points at the owner
    #[error("{owner} is not an owner of {object}")]
    NotOwner {
        /// Owner kind/name that was checked
        owner: String,
        /// Object whose owner references were scanned
        object: String,
    },
}

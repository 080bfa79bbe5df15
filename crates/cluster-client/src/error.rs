//! Cluster client errors

use crate::key::ObjectKey;
use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested object does not exist
    #[error("{kind} {key} not found")]
    NotFound {
        /// Kind of the missing object
        kind: &'static str,
        /// Namespace/name that was looked up
        key: ObjectKey,
    },

    /// Kubernetes API or transport error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Request rejected by the in-memory mock (name conflict, uid precondition,
    /// injected failure). [`KubeClusterClient`](crate::KubeClusterClient) reports
    /// API server rejections as [`ClientError::Kube`].
    #[error("API error: {0}")]
    Api(String),

    /// Object is missing the metadata needed to address it
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Whether the error means the object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

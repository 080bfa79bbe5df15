//! Namespace/name keys for reconcile requests and point reads.

use kube::Resource;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Uniquely identifies a namespaced object of a known type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    /// The object namespace
    pub namespace: String,
    /// The object name
    pub name: String,
}

impl ObjectKey {
    /// Creates a key from namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced object, or `None` if it lacks a namespace or name.
    pub fn from_resource<K: Resource>(resource: &K) -> Option<Self> {
        let meta = resource.meta();
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Error returned when a string is not of the form `namespace/name`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object key {0:?}, expected namespace/name")]
pub struct ParseObjectKeyError(pub String);

impl FromStr for ObjectKey {
    type Err = ParseObjectKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(namespace, name))
            }
            _ => Err(ParseObjectKeyError(s.to_string())),
        }
    }
}

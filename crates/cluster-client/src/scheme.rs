//! Type scheme
//!
//! Maps Rust types to the group/version/kind the API server knows them by.
//! The scheme is built once at startup and shared read-only; resolving a
//! type that was never registered is an error rather than a panic.

use kube::Resource;
use kube::core::GroupVersionKind;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned by [`Scheme::resolve`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemeError {
    /// The type was never registered with the scheme
    #[error("no kind is registered for type {0}")]
    Unregistered(&'static str),
}

/// Registry of statically typed resources.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: HashMap<TypeId, GroupVersionKind>,
}

impl Scheme {
    /// Creates an empty scheme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `K` and returns the scheme, for chained construction.
    #[must_use]
    pub fn with<K>(mut self) -> Self
    where
        K: Resource<DynamicType = ()> + 'static,
    {
        self.register::<K>();
        self
    }

    /// Registers `K` under the group/version/kind it declares.
    pub fn register<K>(&mut self)
    where
        K: Resource<DynamicType = ()> + 'static,
    {
        let gvk = GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()));
        self.kinds.insert(TypeId::of::<K>(), gvk);
    }

    /// Resolves the group/version/kind of `K`.
    pub fn resolve<K: 'static>(&self) -> Result<GroupVersionKind, SchemeError> {
        self.kinds
            .get(&TypeId::of::<K>())
            .cloned()
            .ok_or(SchemeError::Unregistered(type_name::<K>()))
    }

    /// Resolves the group/version/kind of the type of `obj`.
    pub fn resolve_object<K: 'static>(&self, _obj: &K) -> Result<GroupVersionKind, SchemeError> {
        self.resolve::<K>()
    }
}

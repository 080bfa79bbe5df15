//! Ownership checks between a VirtualMachineInstance and a Service.
//!
//! A Service counts as ours when one of its owner references names the owner
//! by api group/version, kind and name. The UID is not compared, so a VMI
//! recreated under the same name keeps control of the Service left behind by
//! its predecessor.

use crate::error::OwnershipError;
use cluster_client::Scheme;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use kube::core::{GroupVersion, GroupVersionKind};

/// Controller owner reference pointing at `owner`.
pub fn controller_reference<O: Resource>(gvk: &GroupVersionKind, owner: &O) -> OwnerReference {
    let meta = owner.meta();
    OwnerReference {
        api_version: gvk.api_version(),
        kind: gvk.kind.clone(),
        name: meta.name.clone().unwrap_or_default(),
        uid: meta.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Checks that `candidate` carries an owner reference to `owner`.
///
/// Returns [`OwnershipError::Scheme`] if the owner's type is unknown to the
/// scheme and [`OwnershipError::NotOwner`] if no reference matches.
pub fn is_controlled_by<O, K>(owner: &O, candidate: &K, scheme: &Scheme) -> Result<(), OwnershipError>
where
    O: Resource + 'static,
    K: Resource,
{
    let gvk = scheme.resolve_object(owner)?;
    let expected = controller_reference(&gvk, owner);

    let matched = candidate
        .meta()
        .owner_references
        .iter()
        .flatten()
        .any(|existing| refers_to_same_object(&expected, existing));

    if matched {
        Ok(())
    } else {
        Err(OwnershipError::NotOwner {
            owner: format!("{}/{}", expected.kind, expected.name),
            object: candidate.meta().name.clone().unwrap_or_default(),
        })
    }
}

/// The controller reference of `candidate`, if it points at an object of type `O`.
///
/// Only the group/version and kind are checked. References without
/// `controller: true` are skipped.
pub fn controller_of<O, K>(candidate: &K) -> Option<&OwnerReference>
where
    O: Resource<DynamicType = ()>,
    K: Resource,
{
    let expected = O::api_version(&()).parse::<GroupVersion>().ok()?;
    let kind = O::kind(&());
    candidate
        .meta()
        .owner_references
        .iter()
        .flatten()
        .find(|reference| {
            reference.controller == Some(true)
                && reference.kind == kind
                && reference
                    .api_version
                    .parse::<GroupVersion>()
                    .is_ok_and(|gv| gv == expected)
        })
}

/// Same group/version (parsed, not string-compared), kind and name.
fn refers_to_same_object(a: &OwnerReference, b: &OwnerReference) -> bool {
    let (Ok(a_gv), Ok(b_gv)) = (
        a.api_version.parse::<GroupVersion>(),
        b.api_version.parse::<GroupVersion>(),
    ) else {
        return false;
    };
    a_gv == b_gv && a.kind == b.kind && a.name == b.name
}

//! KubeVirt Types
//!
//! Typed view of the KubeVirt resources the svc4vmi controller consumes.
//! The CRDs themselves are owned and installed by KubeVirt; nothing here
//! generates or publishes a schema.

pub mod labels;
pub mod virtual_machine_instance;

pub use labels::*;
pub use virtual_machine_instance::*;

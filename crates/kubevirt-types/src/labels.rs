//! Label keys shared between the controller and the objects it manages.

/// Opt-in label on a `VirtualMachineInstance`. Only the exact value
/// [`SERVICE_LABEL_ENABLED`] requests a managed Service.
pub const SERVICE_LABEL: &str = "kubevirt.io/svc";

/// Value of [`SERVICE_LABEL`] that opts a VMI in.
pub const SERVICE_LABEL_ENABLED: &str = "true";

/// Selector key on the managed Service. KubeVirt stamps the same label, with the
/// VMI's uid as value, on the virt-launcher pod.
pub const CREATED_BY_LABEL: &str = "kubevirt.io/created-by";

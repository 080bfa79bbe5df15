//! Reconciliation logic for VirtualMachineInstance Services.
//!
//! Every invocation starts from the request key alone: the VMI and its Service
//! are re-read, the desired Service is rebuilt, and at most one mutation
//! (create or delete) is issued. Replaying a request, or running it after a
//! crash, converges to the same state.

use crate::desired::build_desired;
use crate::error::ControllerError;
use crate::filter::has_svc_label;
use crate::ownership::is_controlled_by;
use cluster_client::{ClusterClientTrait, ObjectKey, Scheme};
use std::sync::Arc;
use tracing::{Instrument, Span, debug, info, info_span, warn};

/// Mutation issued by a reconcile invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Nothing was changed
    None,
    /// The Service was created
    Created,
    /// The Service was deleted
    Deleted,
}

/// Result of a successful reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Ask the scheduler to run this key again even though nothing failed.
    /// Part of the entry-point contract; the current state machine always
    /// converges in one pass and never sets it.
    pub requeue: bool,
    /// What this invocation changed
    pub mutation: Mutation,
}

impl ReconcileOutcome {
    fn converged(mutation: Mutation) -> Self {
        Self {
            requeue: false,
            mutation,
        }
    }
}

/// Reconciles the Service of a single VirtualMachineInstance.
pub struct Reconciler<C> {
    client: Arc<C>,
    scheme: Arc<Scheme>,
    span: Span,
}

impl<C: ClusterClientTrait> Reconciler<C> {
    /// Creates a new reconciler.
    ///
    /// `span` is the parent of the per-request span opened by every
    /// [`reconcile`](Self::reconcile) call.
    pub fn new(client: Arc<C>, scheme: Arc<Scheme>, span: Span) -> Self {
        Self { client, scheme, span }
    }

    /// Reconciles the Service for the VMI at `key`.
    ///
    /// A missing VMI is success. Any other failure is returned as-is and the
    /// caller is expected to retry the key later.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ControllerError> {
        let span = info_span!(
            parent: &self.span,
            "reconcile",
            namespace = %key.namespace,
            name = %key.name
        );
        self.reconcile_key(key).instrument(span).await
    }

    async fn reconcile_key(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ControllerError> {
        info!("Reconciling VirtualMachineInstance {}", key);

        let vmi = match self.client.get_virtual_machine_instance(key).await {
            Ok(vmi) => vmi,
            Err(e) if e.is_not_found() => {
                // Owned Service goes with it through garbage collection
                debug!("VirtualMachineInstance {} no longer exists", key);
                return Ok(ReconcileOutcome::converged(Mutation::None));
            }
            Err(e) => return Err(e.into()),
        };

        let desired = build_desired(&vmi, &self.scheme)?;
        let wants_service = has_svc_label(&vmi);

        let existing = match self.client.get_service(key).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => {
                if !wants_service {
                    return Ok(ReconcileOutcome::converged(Mutation::None));
                }
                info!("Creating Service {}", key);
                self.client.create_service(&desired).await?;
                return Ok(ReconcileOutcome::converged(Mutation::Created));
            }
            Err(e) => return Err(e.into()),
        };

        match is_controlled_by(&vmi, &existing, &self.scheme) {
            Ok(()) if !wants_service => {
                info!("Deleting Service {}", key);
                self.client.delete_service(&existing).await?;
                Ok(ReconcileOutcome::converged(Mutation::Deleted))
            }
            Ok(()) => {
                debug!("Service {} already in place", key);
                Ok(ReconcileOutcome::converged(Mutation::None))
            }
            Err(e) => {
                warn!("Leaving Service {} untouched: {}", key, e);
                Ok(ReconcileOutcome::converged(Mutation::None))
            }
        }
    }
}

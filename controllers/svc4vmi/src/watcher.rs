//! Kubernetes resource watchers.
//!
//! Wires the event filters into `kube_runtime::Controller`:
//! - VirtualMachineInstances are the primary stream. Creates and opt-in label
//!   flips are let through; everything else is dropped before it reaches the
//!   scheduler.
//! - Services are an owned stream carrying delete events only, including
//!   deletes that happened while the watch was down. The runtime maps each one
//!   to the VMI named by its controller owner reference.
//!
//! The runtime guarantees a key is never reconciled twice concurrently and
//! schedules retries through [`error_policy`].

use crate::backoff::RequeueBackoff;
use crate::config::Settings;
use crate::error::ControllerError;
use crate::filter::{ResourceEvent, primary_should_enqueue, secondary_should_enqueue};
use crate::ownership::controller_of;
use crate::reconciler::Reconciler;
use cluster_client::{ClusterClientTrait, ObjectKey};
use futures::{StreamExt, future, stream};
use k8s_openapi::api::core::v1::Service;
use kube::Api;
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{Controller, WatchStreamExt, reflector, watcher};
use kubevirt_types::VirtualMachineInstance;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// State shared by all reconcile invocations.
pub struct Context<C> {
    /// Reconcile engine
    pub reconciler: Reconciler<C>,
    /// Per-key retry delays
    pub backoff: RequeueBackoff,
}

impl<C> Context<C> {
    /// Creates a new context.
    pub fn new(reconciler: Reconciler<C>, backoff: RequeueBackoff) -> Self {
        Self { reconciler, backoff }
    }
}

/// Turns a stream of VMI watch events into create/update/delete events.
///
/// The watch only delivers current objects, so the last seen version of every
/// VMI is kept to compare against. A relist forgets keys that did not come back.
#[derive(Debug, Default)]
pub struct LabelEdges {
    last_seen: HashMap<ObjectKey, VirtualMachineInstance>,
    relist: Option<HashSet<ObjectKey>>,
}

impl LabelEdges {
    /// Returns the VMI if the event should enqueue a reconcile.
    pub fn admit(&mut self, event: watcher::Event<VirtualMachineInstance>) -> Option<VirtualMachineInstance> {
        match event {
            watcher::Event::Init => {
                self.relist = Some(HashSet::new());
                None
            }
            watcher::Event::InitApply(vmi) => {
                if let (Some(seen), Some(key)) = (self.relist.as_mut(), ObjectKey::from_resource(&vmi)) {
                    seen.insert(key);
                }
                self.observe(vmi)
            }
            watcher::Event::InitDone => {
                if let Some(seen) = self.relist.take() {
                    // Deleted while the watch was down; deletes never enqueue
                    self.last_seen.retain(|key, _| seen.contains(key));
                }
                None
            }
            watcher::Event::Apply(vmi) => self.observe(vmi),
            watcher::Event::Delete(vmi) => {
                if let Some(key) = ObjectKey::from_resource(&vmi) {
                    self.last_seen.remove(&key);
                }
                primary_should_enqueue(&ResourceEvent::Delete(&vmi)).then_some(vmi)
            }
        }
    }

    fn observe(&mut self, vmi: VirtualMachineInstance) -> Option<VirtualMachineInstance> {
        let key = ObjectKey::from_resource(&vmi)?;
        let enqueue = match self.last_seen.get(&key) {
            Some(old) if old.metadata.uid == vmi.metadata.uid => {
                primary_should_enqueue(&ResourceEvent::Update { old, new: &vmi })
            }
            // Recreated under the same name while the watch was down
            _ => primary_should_enqueue(&ResourceEvent::Create(&vmi)),
        };
        self.last_seen.insert(key, vmi.clone());
        enqueue.then_some(vmi)
    }
}

/// Tracks Services controlled by a VMI.
///
/// A relist carries no delete events, so Services missing from it are reported
/// as deleted once it completes.
#[derive(Debug, Default)]
pub struct OwnedServices {
    last_seen: HashMap<ObjectKey, Service>,
    relist: Option<HashSet<ObjectKey>>,
}

impl OwnedServices {
    /// Returns the Services whose event should enqueue their owner.
    ///
    /// Returned Services carry only their VMI controller reference, so each maps
    /// back to exactly one VMI. Services without one are never returned.
    pub fn admit(&mut self, event: watcher::Event<Service>) -> Vec<Service> {
        match event {
            watcher::Event::Init => {
                self.relist = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(svc) => self.observe(&svc, true),
            watcher::Event::InitDone => {
                let Some(seen) = self.relist.take() else {
                    return Vec::new();
                };
                let (kept, gone): (HashMap<_, _>, HashMap<_, _>) = std::mem::take(&mut self.last_seen)
                    .into_iter()
                    .partition(|(key, _)| seen.contains(key));
                self.last_seen = kept;
                gone.into_values()
                    .filter(|svc| secondary_should_enqueue(&ResourceEvent::Delete(svc)))
                    .collect()
            }
            watcher::Event::Apply(svc) => self.observe(&svc, false),
            watcher::Event::Delete(svc) => {
                if let Some(key) = ObjectKey::from_resource(&svc) {
                    self.last_seen.remove(&key);
                }
                controlled(&svc)
                    .filter(|svc| secondary_should_enqueue(&ResourceEvent::Delete(svc)))
                    .into_iter()
                    .collect()
            }
        }
    }

    fn observe(&mut self, svc: &Service, relisting: bool) -> Vec<Service> {
        let Some(key) = ObjectKey::from_resource(svc) else {
            return Vec::new();
        };
        let Some(svc) = controlled(svc) else {
            // Controller reference dropped or never there
            self.last_seen.remove(&key);
            return Vec::new();
        };
        if relisting {
            if let Some(seen) = self.relist.as_mut() {
                seen.insert(key.clone());
            }
        }
        let enqueue = match self.last_seen.get(&key) {
            Some(old) => secondary_should_enqueue(&ResourceEvent::Update { old, new: &svc }),
            None => secondary_should_enqueue(&ResourceEvent::Create(&svc)),
        };
        self.last_seen.insert(key, svc.clone());
        if enqueue { vec![svc] } else { Vec::new() }
    }
}

/// Copy of `svc` keeping only its VMI controller reference.
fn controlled(svc: &Service) -> Option<Service> {
    let owner = controller_of::<VirtualMachineInstance, _>(svc)?.clone();
    let mut svc = svc.clone();
    svc.metadata.owner_references = Some(vec![owner]);
    Some(svc)
}

/// Reconcile entry point handed to the runtime.
pub async fn reconcile<C: ClusterClientTrait>(
    vmi: Arc<VirtualMachineInstance>,
    ctx: Arc<Context<C>>,
) -> Result<Action, ControllerError> {
    let key = ObjectKey::from_resource(vmi.as_ref()).ok_or_else(|| {
        ControllerError::InvalidObject("VirtualMachineInstance missing namespace or name".to_string())
    })?;

    let outcome = ctx.reconciler.reconcile(&key).await?;
    ctx.backoff.reset(&key.to_string());

    if outcome.requeue {
        Ok(Action::requeue(ctx.backoff.min_delay()))
    } else {
        Ok(Action::await_change())
    }
}

/// Error policy: requeue with per-key Fibonacci backoff.
pub fn error_policy<C>(
    vmi: Arc<VirtualMachineInstance>,
    error: &ControllerError,
    ctx: Arc<Context<C>>,
) -> Action {
    let key = ObjectKey::from_resource(vmi.as_ref())
        .map_or_else(|| "<unknown>".to_string(), |key| key.to_string());
    let delay = ctx.backoff.next_delay(&key);
    if error.is_not_found() {
        // Raced with a delete; the next attempt sees the new state
        debug!("VirtualMachineInstance {} changed underneath reconcile, retrying in {:?}: {}", key, delay, error);
        return Action::requeue(delay);
    }
    warn!("Reconciliation of VirtualMachineInstance {} failed, retrying in {:?}: {}", key, delay, error);
    Action::requeue(delay)
}

/// Watches VirtualMachineInstances and their Services.
pub struct Watcher<C> {
    context: Arc<Context<C>>,
    vmi_api: Api<VirtualMachineInstance>,
    service_api: Api<Service>,
    runtime_config: RuntimeConfig,
}

impl<C: ClusterClientTrait + 'static> Watcher<C> {
    /// Creates a new watcher instance.
    pub fn new(
        context: Arc<Context<C>>,
        vmi_api: Api<VirtualMachineInstance>,
        service_api: Api<Service>,
        settings: &Settings,
    ) -> Self {
        // Debounce batches bursts of events for the same key
        let runtime_config = RuntimeConfig::default()
            .debounce(settings.debounce)
            .concurrency(settings.concurrency);
        Self {
            context,
            vmi_api,
            service_api,
            runtime_config,
        }
    }

    /// Runs the controller until a shutdown signal arrives.
    pub async fn watch(&self) -> Result<(), ControllerError> {
        info!("Starting VirtualMachineInstance and Service watchers");

        let (reader, writer) = reflector::store();
        let mut edges = LabelEdges::default();
        let vmis = watcher(self.vmi_api.clone(), watcher::Config::default())
            .default_backoff()
            .reflect(writer)
            .filter_map(move |event| {
                future::ready(match event {
                    Ok(event) => edges.admit(event).map(Ok),
                    Err(e) => Some(Err(e)),
                })
            });

        let mut owned = OwnedServices::default();
        let services = watcher(self.service_api.clone(), watcher::Config::default())
            .default_backoff()
            .flat_map(move |event| {
                stream::iter(match event {
                    Ok(event) => owned.admit(event).into_iter().map(Ok).collect::<Vec<_>>(),
                    Err(e) => vec![Err(e)],
                })
            });

        Controller::for_stream(vmis, reader)
            .owns_stream(services)
            .with_config(self.runtime_config.clone())
            .shutdown_on_signal()
            .run(reconcile, error_policy, Arc::clone(&self.context))
            .for_each(|res| async move {
                match res {
                    Ok((obj, _action)) => debug!("Reconciled VirtualMachineInstance {}", obj),
                    // A Service delete can outlive its VMI
                    Err(kube_runtime::controller::Error::ObjectNotFound(obj)) => {
                        debug!("VirtualMachineInstance {} is gone, skipping", obj);
                    }
                    Err(e) => error!("Controller error: {}", e),
                }
            })
            .await;

        info!("VirtualMachineInstance controller stopped");
        Ok(())
    }
}

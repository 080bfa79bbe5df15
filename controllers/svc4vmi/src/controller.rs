//! Main controller implementation.
//!
//! Builds the cluster client and reconcile context, then runs the watcher for
//! VirtualMachineInstances and their Services on its own task.

use crate::backoff::RequeueBackoff;
use crate::config::Settings;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::{Context, Watcher};
use cluster_client::{KubeClusterClient, Scheme};
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use kubevirt_types::VirtualMachineInstance;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, info_span};

/// Main controller for VirtualMachineInstance Services.
#[derive(Debug)]
pub struct Controller {
    watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts watching.
    pub async fn new(settings: Settings) -> Result<Self, ControllerError> {
        info!("Initializing svc4vmi controller");

        let kube_client = Client::try_default().await?;

        let scheme = Scheme::new()
            .with::<VirtualMachineInstance>()
            .with::<Service>();
        let reconciler = Reconciler::new(
            Arc::new(KubeClusterClient::new(kube_client.clone())),
            Arc::new(scheme),
            info_span!("svc4vmi"),
        );
        let context = Arc::new(Context::new(
            reconciler,
            RequeueBackoff::new(settings.requeue_min, settings.requeue_max),
        ));

        let (vmi_api, service_api): (Api<VirtualMachineInstance>, Api<Service>) =
            match settings.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client, ns),
                ),
                None => (Api::all(kube_client.clone()), Api::all(kube_client)),
            };

        let watcher = Watcher::new(context, vmi_api, service_api, &settings);
        let watcher = tokio::spawn(async move { watcher.watch().await });

        Ok(Self { watcher })
    }

    /// Runs until the watcher exits.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("svc4vmi controller running");

        self.watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("VirtualMachineInstance watcher panicked: {e}")))??;

        info!("svc4vmi controller shut down");
        Ok(())
    }
}

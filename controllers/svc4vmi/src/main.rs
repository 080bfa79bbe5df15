//! svc4vmi Controller
//!
//! Exposes SSH on KubeVirt VirtualMachineInstances. Every VMI labelled
//! `kubevirt.io/svc=true` gets a NodePort Service named after it, owned by it,
//! and selecting its pods; removing the label removes the Service.

mod backoff;
mod config;
mod controller;
mod desired;
mod error;
mod filter;
mod ownership;
mod reconciler;
mod watcher;

#[cfg(test)]
mod reconciler_test;
#[cfg(test)]
mod test_utils;

use anyhow::Context as _;
use config::Settings;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting svc4vmi controller");

    let settings = Settings::from_env().context("loading configuration")?;

    info!("Configuration:");
    info!("  Namespace: {}", settings.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Concurrency: {}", settings.concurrency);
    info!("  Debounce: {:?}", settings.debounce);
    info!("  Requeue backoff: {:?} to {:?}", settings.requeue_min, settings.requeue_max);

    let controller = Controller::new(settings)
        .await
        .context("initializing controller")?;
    controller.run().await.context("running controller")?;

    Ok(())
}

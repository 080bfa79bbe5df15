//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Namespace to watch (`WATCH_NAMESPACE`); `None` watches all namespaces
    pub namespace: Option<String>,
    /// Maximum concurrent reconciles (`RECONCILE_CONCURRENCY`)
    pub concurrency: u16,
    /// Quiet period before a burst of events is reconciled (`RECONCILE_DEBOUNCE_SECS`)
    pub debounce: Duration,
    /// First retry delay after a failed reconcile (`REQUEUE_MIN_SECS`)
    pub requeue_min: Duration,
    /// Retry delay cap (`REQUEUE_MAX_SECS`)
    pub requeue_max: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: None,
            concurrency: 4,
            debounce: Duration::from_secs(1),
            requeue_min: Duration::from_secs(5),
            requeue_max: Duration::from_secs(300),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads settings through `lookup`, falling back to defaults for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let defaults = Self::default();

        let namespace = lookup("WATCH_NAMESPACE")
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());
        let concurrency = parse_var(&lookup, "RECONCILE_CONCURRENCY", defaults.concurrency)?;
        let debounce = parse_var(&lookup, "RECONCILE_DEBOUNCE_SECS", defaults.debounce.as_secs())?;
        let requeue_min = parse_var(&lookup, "REQUEUE_MIN_SECS", defaults.requeue_min.as_secs())?;
        let requeue_max = parse_var(&lookup, "REQUEUE_MAX_SECS", defaults.requeue_max.as_secs())?;

        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be greater than 0".to_string(),
            ));
        }
        if requeue_min == 0 {
            return Err(ControllerError::InvalidConfig(
                "REQUEUE_MIN_SECS must be greater than 0".to_string(),
            ));
        }
        if requeue_min > requeue_max {
            return Err(ControllerError::InvalidConfig(format!(
                "REQUEUE_MIN_SECS ({requeue_min}) must not exceed REQUEUE_MAX_SECS ({requeue_max})"
            )));
        }

        Ok(Self {
            namespace,
            concurrency,
            debounce: Duration::from_secs(debounce),
            requeue_min: Duration::from_secs(requeue_min),
            requeue_max: Duration::from_secs(requeue_max),
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{name}={raw:?} is invalid: {e}"))
        }),
    }
}

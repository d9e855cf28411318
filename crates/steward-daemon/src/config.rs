//! Daemon configuration from the environment, with CLI overrides.

use std::time::Duration;

use steward_store::StoreBackend;

/// Message-bus gateway endpoint. The only required setting.
pub const BUS_URL_VAR: &str = "CONTHESIS_BUS_URL";
/// Seconds between reconcile cycles.
pub const CYCLE_INTERVAL_VAR: &str = "STEWARD_CYCLE_INTERVAL_SECS";
/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_VAR: &str = "STEWARD_REQUEST_TIMEOUT_SECS";
/// Store backend: `cas` or `combined`.
pub const STORE_BACKEND_VAR: &str = "STEWARD_STORE_BACKEND";

pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub bus_url: String,
    pub cycle_interval: Duration,
    pub request_timeout: Duration,
    pub backend: StoreBackend,
}

/// Settings taken from the command line; anything unset falls back to the
/// environment and then the defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bus_url: Option<String>,
    pub cycle_interval: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub backend: Option<StoreBackend>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{BUS_URL_VAR} is not set and no --bus-url was given")]
    MissingBusUrl,
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl DaemonConfig {
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let bus_url = overrides
            .bus_url
            .or_else(|| env_var(BUS_URL_VAR))
            .ok_or(ConfigError::MissingBusUrl)?;

        let cycle_interval = match overrides.cycle_interval {
            Some(interval) => interval,
            None => env_secs(CYCLE_INTERVAL_VAR)?.unwrap_or(DEFAULT_CYCLE_INTERVAL),
        };
        let request_timeout = match overrides.request_timeout {
            Some(timeout) => timeout,
            None => env_secs(REQUEST_TIMEOUT_VAR)?.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        };
        let backend = match overrides.backend {
            Some(backend) => backend,
            None => env_backend(STORE_BACKEND_VAR)?.unwrap_or_default(),
        };

        Ok(Self {
            bus_url,
            cycle_interval,
            request_timeout,
            backend,
        })
    }
}

fn env_var(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn env_secs(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env_var(var) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| ConfigError::Invalid {
                var,
                value,
                reason: e.to_string(),
            }),
    }
}

fn env_backend(var: &'static str) -> Result<Option<StoreBackend>, ConfigError> {
    match env_var(var) {
        None => Ok(None),
        Some(value) => value
            .parse::<StoreBackend>()
            .map(Some)
            .map_err(|reason| ConfigError::Invalid { var, value, reason }),
    }
}

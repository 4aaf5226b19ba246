//! Service configuration with environment overrides.

use std::env;
use std::time::Duration;

use tracing::warn;
use vconnect_dataset_store::DEFAULT_CACHE_TTL;
use vconnect_remote::RemoteConfig;

/// Where audio recordings are served from; joined with a record's file name.
pub const DEFAULT_AUDIO_BASE_URL: &str =
    "https://vconnect-alert.winzetech.com/uploads/audio/recordings";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the [`crate::DataService`] needs to talk to the backend and
/// size its cache. Built from defaults, then environment, then CLI flags.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_url: String,
    pub audio_base_url: String,
    pub api_key: Option<String>,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    /// Broadcast capacity of the notification bus.
    pub bus_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: RemoteConfig::default().base_url,
            audio_base_url: DEFAULT_AUDIO_BASE_URL.to_string(),
            api_key: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            bus_capacity: 64,
        }
    }
}

impl ServiceConfig {
    /// Defaults overlaid with `VCONNECT_*` environment variables. Durations
    /// use humantime syntax ("5m", "30s"); unparsable values are logged and
    /// ignored rather than aborting startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = non_empty_var("VCONNECT_BASE_URL") {
            config.base_url = url;
        }
        if let Some(url) = non_empty_var("VCONNECT_AUDIO_BASE_URL") {
            config.audio_base_url = url;
        }
        if let Some(key) = non_empty_var("VCONNECT_API_KEY") {
            config.api_key = Some(key);
        }
        if let Some(ttl) = duration_var("VCONNECT_CACHE_TTL") {
            config.cache_ttl = ttl;
        }
        if let Some(timeout) = duration_var("VCONNECT_REQUEST_TIMEOUT") {
            config.request_timeout = timeout;
        }
        config
    }

    pub fn remote(&self) -> RemoteConfig {
        RemoteConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn duration_var(name: &str) -> Option<Duration> {
    let raw = non_empty_var(name)?;
    match humantime::parse_duration(&raw) {
        Ok(duration) => Some(duration),
        Err(err) => {
            warn!(var = name, value = %raw, error = %err, "ignoring unparsable duration");
            None
        }
    }
}

//! Configuration structures with documented defaults
//!
//! Every section derives `Default` and carries `#[serde(default)]`, so a
//! partial configuration document merges key-wise with the defaults: nested
//! sections combine, scalars overwrite. There is no other global state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Phase deadlines for a render call, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Page-load budget for the first render after a process start. The
    /// worker warms caches on its first page, so this is larger than the
    /// steady-state value.
    pub initial_page_load: f64,

    /// Steady-state page-load budget.
    pub page_load: f64,

    /// Additional time after page load for the worker to formulate and
    /// return its response.
    pub render_response: f64,

    /// Response budget for the first render after a process start.
    pub initial_render_response: f64,

    /// Maximum time for the worker process to start before giving up.
    pub process_startup: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            initial_page_load: 10.0,
            page_load: 5.0,
            render_response: 5.0,
            initial_render_response: 15.0,
            process_startup: 10.0,
        }
    }
}

impl TimeoutConfig {
    pub fn initial_page_load(&self) -> Duration {
        Duration::from_secs_f64(self.initial_page_load)
    }

    pub fn page_load(&self) -> Duration {
        Duration::from_secs_f64(self.page_load)
    }

    pub fn render_response(&self) -> Duration {
        Duration::from_secs_f64(self.render_response)
    }

    pub fn initial_render_response(&self) -> Duration {
        Duration::from_secs_f64(self.initial_render_response)
    }

    pub fn process_startup(&self) -> Duration {
        Duration::from_secs_f64(self.process_startup)
    }
}

/// Idle and age eviction thresholds for the lifecycle supervisor, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeConfig {
    /// Shut the wrapped renderer down after this much time without a render.
    pub idle_shutdown_sec: f64,

    /// Shut the wrapped renderer down once it has been alive this long,
    /// regardless of activity.
    pub max_lifetime_sec: f64,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            idle_shutdown_sec: 300.0,
            max_lifetime_sec: 1800.0,
        }
    }
}

impl LifetimeConfig {
    pub fn idle_shutdown(&self) -> Duration {
        Duration::from_secs_f64(self.idle_shutdown_sec)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs_f64(self.max_lifetime_sec)
    }
}

/// Configuration for a local worker-process session.
///
/// `executable` is required: construction fails when it is empty or does not
/// exist on disk. `env` is passed verbatim to the worker; the expected use is
/// a timezone override (`TZ`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeouts: TimeoutConfig,

    /// Quiet period, in milliseconds, the worker waits after the last
    /// resource finishes loading before painting. Forwarded on the wire
    /// when set.
    pub resource_wait_ms: Option<u64>,

    pub lifetime: LifetimeConfig,
}

/// Configuration for the remote-offload client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Endpoint of the remote render host.
    pub url: String,

    /// Sent as `x-api-key` when present.
    pub api_key: Option<String>,

    /// Whole-request deadline for the HTTP exchange, in seconds.
    pub request_timeout_sec: f64,

    pub lifetime: LifetimeConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            request_timeout_sec: 60.0,
            lifetime: LifetimeConfig::default(),
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_defaults_match_documented_values() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.initial_page_load, 10.0);
        assert_eq!(timeouts.page_load, 5.0);
        assert_eq!(timeouts.render_response, 5.0);
        assert_eq!(timeouts.initial_render_response, 15.0);
        assert_eq!(timeouts.process_startup, 10.0);
    }

    #[test]
    fn lifetime_defaults_match_documented_values() {
        let lifetime = LifetimeConfig::default();
        assert_eq!(lifetime.idle_shutdown_sec, 300.0);
        assert_eq!(lifetime.max_lifetime_sec, 1800.0);
    }

    #[test]
    fn partial_config_merges_with_defaults_key_wise() {
        let config: ProcessConfig = serde_json::from_str(
            r#"{
                "executable": "/usr/bin/render-worker",
                "timeouts": {"page_load": 2.5},
                "lifetime": {"idle_shutdown_sec": 30.0}
            }"#,
        )
        .unwrap();

        assert_eq!(config.executable, PathBuf::from("/usr/bin/render-worker"));
        // overridden scalars
        assert_eq!(config.timeouts.page_load, 2.5);
        assert_eq!(config.lifetime.idle_shutdown_sec, 30.0);
        // untouched siblings keep their defaults
        assert_eq!(config.timeouts.initial_render_response, 15.0);
        assert_eq!(config.lifetime.max_lifetime_sec, 1800.0);
        assert!(config.args.is_empty());
        assert!(config.env.is_empty());
    }

    #[test]
    fn durations_convert_from_fractional_seconds() {
        let lifetime = LifetimeConfig {
            idle_shutdown_sec: 0.5,
            max_lifetime_sec: 60.0,
        };
        assert_eq!(lifetime.idle_shutdown(), Duration::from_millis(500));
        assert_eq!(lifetime.max_lifetime(), Duration::from_secs(60));
    }
}

//! # Bridge configuration.
//!
//! Provides [`Config`] centralized settings for the bridge runtime.
//!
//! Config is loaded **once** at startup (YAML file and/or CLI overrides) and is
//! immutable afterwards. It is passed by reference (or `Arc`) into the
//! dispatcher, the poll loop and the bus adapter.
//!
//! ## Example file
//! ```yaml
//! host: localhost
//! port: 8125
//! interval_ms: 10000
//! global_tags:
//!   - env:production
//! status_checks: true
//! ```
//!
//! ## Sentinel values
//! - `pm2_home = None` → `$PM2_HOME`, falling back to `~/.pm2`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::BridgeError;
use crate::policies::BackoffPolicy;

/// Global configuration for the bridge.
///
/// ## Field semantics
/// - `global_tags`: appended to every datagram sent to DogStatsD
/// - `host` / `port`: DogStatsD agent address (UDP)
/// - `interval_ms`: delay between two poll iterations (fixed delay, not fixed rate)
/// - `status_checks`: emit `pm2.processes.status` service checks while polling
/// - `bus_capacity`: in-process event bus ring buffer size (min 1)
/// - `grace_ms`: how long to wait for tasks on shutdown
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tags attached to every metric, event and check.
    pub global_tags: Vec<String>,

    /// DogStatsD host.
    pub host: String,

    /// DogStatsD UDP port.
    pub port: u16,

    /// Poll interval in milliseconds.
    pub interval_ms: u64,

    /// Emit a per-process status service check on every poll.
    pub status_checks: bool,

    /// PM2 home directory (holds `pub.sock`).
    pub pm2_home: Option<PathBuf>,

    /// `pm2` executable used for process enumeration.
    pub pm2_bin: String,

    /// Capacity of the in-process event bus.
    pub bus_capacity: usize,

    /// Shutdown grace period in milliseconds.
    pub grace_ms: u64,

    /// First reconnect delay to the PM2 bus, in milliseconds.
    pub reconnect_first_ms: u64,

    /// Upper bound for reconnect delays, in milliseconds.
    pub reconnect_max_ms: u64,
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::load_from_str(&content)
    }

    /// Loads configuration from a YAML string and validates it.
    pub fn load_from_str(content: &str) -> Result<Self, BridgeError> {
        let cfg: Config = serde_yaml::from_str(content)
            .map_err(|e| BridgeError::config(format!("failed to parse YAML: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the values that would make the bridge useless at runtime.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(BridgeError::config("port must be non-zero"));
        }
        if self.interval_ms == 0 {
            return Err(BridgeError::config("interval_ms must be positive"));
        }
        if self.reconnect_first_ms > self.reconnect_max_ms {
            return Err(BridgeError::config(
                "reconnect_first_ms must not exceed reconnect_max_ms",
            ));
        }
        Ok(())
    }

    /// Delay between two poll iterations.
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Shutdown grace period.
    #[inline]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Backoff used when (re)connecting to the PM2 bus.
    pub fn reconnect_backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(self.reconnect_first_ms),
            max: Duration::from_millis(self.reconnect_max_ms),
            factor: 2.0,
        }
    }

    /// Resolves the PM2 home directory.
    ///
    /// Order: explicit `pm2_home`, `$PM2_HOME`, `~/.pm2`, `./.pm2`.
    pub fn resolved_pm2_home(&self) -> PathBuf {
        if let Some(home) = &self.pm2_home {
            return home.clone();
        }
        if let Some(env) = std::env::var_os("PM2_HOME") {
            return PathBuf::from(env);
        }
        dirs_next::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pm2")
    }

    /// Path of the PM2 publish socket carrying bus events.
    pub fn pub_socket_path(&self) -> PathBuf {
        self.resolved_pm2_home().join("pub.sock")
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `host = "localhost"`, `port = 8125` (standard DogStatsD agent)
    /// - `interval_ms = 10000`
    /// - `global_tags = []`
    /// - `status_checks = true`
    /// - `bus_capacity = 1024`
    /// - `grace_ms = 5000`
    /// - reconnect backoff from 500ms up to 30s
    fn default() -> Self {
        Self {
            global_tags: Vec::new(),
            host: "localhost".to_string(),
            port: 8125,
            interval_ms: 10_000,
            status_checks: true,
            pm2_home: None,
            pm2_bin: "pm2".to_string(),
            bus_capacity: 1024,
            grace_ms: 5_000,
            reconnect_first_ms: 500,
            reconnect_max_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = Config::load_from_str("port: 9125\nglobal_tags: [\"env:prod\"]\n").unwrap();
        assert_eq!(cfg.port, 9125);
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.global_tags, vec!["env:prod".to_string()]);
        assert_eq!(cfg.interval(), Duration::from_secs(10));
        assert!(cfg.status_checks);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Config::load_from_str("interval_ms: 0\n").unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(Config::load_from_str("host: \"  \"\n").is_err());
    }

    #[test]
    fn garbage_yaml_is_a_config_error() {
        let err = Config::load_from_str("port: [1, 2").unwrap_err();
        assert!(matches!(err, BridgeError::Config { .. }));
    }

    #[test]
    fn explicit_home_wins() {
        let cfg = Config {
            pm2_home: Some(PathBuf::from("/srv/pm2")),
            ..Config::default()
        };
        assert_eq!(cfg.pub_socket_path(), PathBuf::from("/srv/pm2/pub.sock"));
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn load_from_file_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        std::fs::write(&path, "host: agent\ninterval_ms: 250\n").unwrap();

        let cfg = Config::load_from_file(&path).unwrap();
        assert_eq!(cfg.host, "agent");
        assert_eq!(cfg.interval(), Duration::from_millis(250));
    }
}

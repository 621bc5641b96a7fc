//! # Metrics backend: the DogStatsD client and the sink abstraction.
//!
//! Everything the bridge emits goes through [`MetricsSink`]. The production
//! implementation is [`DogStatsd`], a connected UDP socket speaking the
//! DogStatsD datagram protocol. Calls are fire-and-forget: a sink never returns
//! an error, it logs transport failures at its own boundary.
//!
//! ## Calls
//! ```text
//! event(title, text, {date_happened, aggregation_key, alert_type}, tags)
//! check(name, status, {date_happened, message}, tags)
//! gauge(name, value, tags)
//! timing(name, duration, tags)
//! ```

mod client;
mod format;
#[cfg(test)]
pub(crate) mod recorder;

pub use client::DogStatsd;

use std::time::Duration;

use crate::events::ProcessStatus;
use crate::tags::TagSet;

/// Number of managed processes.
pub const METRIC_INSTALLED: &str = "pm2.processes.installed";
/// Per-process CPU usage (percent).
pub const METRIC_CPU: &str = "pm2.processes.cpu";
/// Per-process resident memory (bytes).
pub const METRIC_MEMORY: &str = "pm2.processes.memory";
/// Uptime of a process when it exits (milliseconds).
pub const METRIC_UPTIME: &str = "pm2.processes.uptime";
/// Restart counter of a process.
pub const METRIC_RESTART: &str = "pm2.processes.restart";
/// Per-process status service check.
pub const CHECK_STATUS: &str = "pm2.processes.status";
/// Application health service check driven by lifecycle events.
pub const CHECK_APP_OK: &str = "app.is_ok";

/// Service check status, as encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl CheckStatus {
    /// Numeric wire value.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<&ProcessStatus> for CheckStatus {
    fn from(status: &ProcessStatus) -> Self {
        match status {
            ProcessStatus::Errored => CheckStatus::Critical,
            ProcessStatus::Launching => CheckStatus::Ok,
            ProcessStatus::OneLaunch => CheckStatus::Unknown,
            ProcessStatus::Online => CheckStatus::Ok,
            ProcessStatus::Stopped => CheckStatus::Warning,
            ProcessStatus::Stopping => CheckStatus::Warning,
            ProcessStatus::WaitingRestart => CheckStatus::Unknown,
            ProcessStatus::Other(_) => CheckStatus::Unknown,
        }
    }
}

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    Error,
    Warning,
    Info,
    Success,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::Error => "error",
            AlertType::Warning => "warning",
            AlertType::Info => "info",
            AlertType::Success => "success",
        }
    }
}

/// Optional event fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOptions {
    /// Seconds since the Unix epoch.
    pub date_happened: Option<u64>,
    /// Groups related events in the backend.
    pub aggregation_key: Option<String>,
    pub alert_type: Option<AlertType>,
}

impl EventOptions {
    pub fn at(date_happened: u64) -> Self {
        Self {
            date_happened: Some(date_happened),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn alert(mut self, alert_type: AlertType) -> Self {
        self.alert_type = Some(alert_type);
        self
    }

    #[must_use]
    pub fn aggregate(mut self, key: impl Into<String>) -> Self {
        self.aggregation_key = Some(key.into());
        self
    }
}

/// Optional service check fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Seconds since the Unix epoch.
    pub date_happened: Option<u64>,
    pub message: Option<String>,
}

impl CheckOptions {
    pub fn at(date_happened: u64) -> Self {
        Self {
            date_happened: Some(date_happened),
            message: None,
        }
    }
}

/// Destination of every metric, event and service check.
///
/// Implementations must not block and must not fail: transport errors are
/// handled (logged) inside the sink.
pub trait MetricsSink: Send + Sync + 'static {
    /// Sends an event. `text` defaults to the title when `None`.
    fn event(&self, title: &str, text: Option<&str>, opts: &EventOptions, tags: &TagSet);

    /// Sends a service check.
    fn check(&self, name: &str, status: CheckStatus, opts: &CheckOptions, tags: &TagSet);

    /// Sends a gauge value.
    fn gauge(&self, name: &str, value: f64, tags: &TagSet);

    /// Sends a timing in milliseconds.
    fn timing(&self, name: &str, duration: Duration, tags: &TagSet);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_total() {
        assert_eq!(CheckStatus::from(&ProcessStatus::Errored), CheckStatus::Critical);
        assert_eq!(CheckStatus::from(&ProcessStatus::Launching), CheckStatus::Ok);
        assert_eq!(CheckStatus::from(&ProcessStatus::OneLaunch), CheckStatus::Unknown);
        assert_eq!(CheckStatus::from(&ProcessStatus::Online), CheckStatus::Ok);
        assert_eq!(CheckStatus::from(&ProcessStatus::Stopped), CheckStatus::Warning);
        assert_eq!(CheckStatus::from(&ProcessStatus::Stopping), CheckStatus::Warning);
        assert_eq!(CheckStatus::from(&ProcessStatus::Other("sleeping".into())), CheckStatus::Unknown);
    }

    #[test]
    fn check_codes_match_wire_values() {
        assert_eq!(CheckStatus::Ok.code(), 0);
        assert_eq!(CheckStatus::Warning.code(), 1);
        assert_eq!(CheckStatus::Critical.code(), 2);
        assert_eq!(CheckStatus::Unknown.code(), 3);
    }
}

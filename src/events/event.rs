//! # Process lifecycle events received from the PM2 bus.
//!
//! The [`ProcessEvent`] struct mirrors the payload PM2 publishes on its
//! `process:event` topic: a wall-clock timestamp, the raw event name and a
//! snapshot of the process environment at the time of the transition.
//!
//! The raw name stays a string on the wire. [`EventKind`] is the closed set of
//! names the bridge reacts to; anything else maps to `None` and is ignored.
//!
//! ## Example
//! ```rust
//! use pm2_datadog::{EventKind, ProcessEvent, ProcessStatus};
//!
//! let ev: ProcessEvent = serde_json::from_str(r#"{
//!     "at": 1700000000000,
//!     "event": "stop",
//!     "process": { "name": "api", "pm_cwd": "/srv/api", "NODE_APP_INSTANCE": 0,
//!                  "pm_uptime": 1699999990000, "restart_time": 2, "status": "stopped" }
//! }"#).unwrap();
//!
//! assert_eq!(ev.kind(), Some(EventKind::Stop));
//! assert_eq!(ev.process.status, ProcessStatus::Stopped);
//! assert_eq!(ev.at_secs(), 1_700_000_000);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

/// Lifecycle transitions the bridge translates into backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Process was removed from the process list.
    Delete,
    /// Process exited (crash or stop).
    Exit,
    /// Process was restarted, manually or after a crash.
    Restart,
    /// Process was gracefully reloaded.
    Reload,
    /// Process exceeded its restart limit and will not be restarted.
    RestartOverlimit,
    /// Process was manually started.
    Start,
    /// Process was manually stopped.
    Stop,
}

impl EventKind {
    /// All recognized kinds, in wire-name order.
    pub const ALL: [EventKind; 7] = [
        EventKind::Delete,
        EventKind::Exit,
        EventKind::Restart,
        EventKind::Reload,
        EventKind::RestartOverlimit,
        EventKind::Start,
        EventKind::Stop,
    ];

    /// Maps a raw PM2 event name to a kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "delete" => Some(EventKind::Delete),
            "exit" => Some(EventKind::Exit),
            "restart" => Some(EventKind::Restart),
            "reload" => Some(EventKind::Reload),
            "restart overlimit" => Some(EventKind::RestartOverlimit),
            "start" => Some(EventKind::Start),
            "stop" => Some(EventKind::Stop),
            _ => None,
        }
    }

    /// Wire name as PM2 publishes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Delete => "delete",
            EventKind::Exit => "exit",
            EventKind::Restart => "restart",
            EventKind::Reload => "reload",
            EventKind::RestartOverlimit => "restart overlimit",
            EventKind::Start => "start",
            EventKind::Stop => "stop",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PM2 process status.
///
/// Statuses outside the known set keep the raw string PM2 sent, so it still
/// reaches the `status:` tag and event titles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ProcessStatus {
    Errored,
    Launching,
    OneLaunch,
    Online,
    Stopped,
    Stopping,
    WaitingRestart,
    /// Any status this version does not know about.
    Other(String),
}

impl From<String> for ProcessStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "errored" => ProcessStatus::Errored,
            "launching" => ProcessStatus::Launching,
            "one-launch-status" => ProcessStatus::OneLaunch,
            "online" => ProcessStatus::Online,
            "stopped" => ProcessStatus::Stopped,
            "stopping" => ProcessStatus::Stopping,
            "waiting restart" => ProcessStatus::WaitingRestart,
            _ => ProcessStatus::Other(raw),
        }
    }
}

impl ProcessStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessStatus::Errored => "errored",
            ProcessStatus::Launching => "launching",
            ProcessStatus::OneLaunch => "one-launch-status",
            ProcessStatus::Online => "online",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::WaitingRestart => "waiting restart",
            ProcessStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version-control metadata PM2 collects for a process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Versioning {
    /// Current branch, `HEAD` when detached.
    #[serde(default)]
    pub branch: Option<String>,
}

/// Snapshot of a process environment carried by a lifecycle event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessSnapshot {
    /// Application name.
    pub name: String,
    /// Working directory of the process.
    #[serde(default)]
    pub pm_cwd: Option<PathBuf>,
    /// Cluster instance identifier.
    #[serde(
        rename = "NODE_APP_INSTANCE",
        default = "default_instance",
        deserialize_with = "deserialize_instance"
    )]
    pub instance: String,
    /// Start time of the current run, milliseconds since the Unix epoch.
    #[serde(default)]
    pub pm_uptime: u64,
    /// Number of restarts so far.
    #[serde(default)]
    pub restart_time: u64,
    /// Status at the time of the event.
    pub status: ProcessStatus,
    /// Exit code, only meaningful for `exit` events.
    #[serde(default)]
    pub exit_code: Option<i64>,
    /// Version-control metadata, when PM2 could read it.
    #[serde(default)]
    pub versioning: Option<Versioning>,
}

impl ProcessSnapshot {
    /// Branch name, if version control info is present.
    pub fn branch(&self) -> Option<&str> {
        self.versioning.as_ref()?.branch.as_deref()
    }

    /// Milliseconds between `pm_uptime` and `now_ms`, saturating at zero.
    pub fn uptime_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.pm_uptime)
    }
}

/// One lifecycle notification from the process manager.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessEvent {
    /// Wall-clock time of the transition, milliseconds since the Unix epoch.
    pub at: u64,
    /// Raw event name.
    pub event: String,
    /// Whether the transition was triggered by a user command.
    #[serde(default)]
    pub manually: bool,
    /// Process environment at the time of the event.
    pub process: ProcessSnapshot,
}

impl ProcessEvent {
    /// Recognized kind of this event, `None` for names the bridge ignores.
    #[inline]
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_name(&self.event)
    }

    /// Event timestamp in whole seconds, as DogStatsD expects it.
    #[inline]
    pub fn at_secs(&self) -> u64 {
        self.at / 1000
    }
}

pub(crate) fn default_instance() -> String {
    "0".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstance {
    Number(i64),
    Text(String),
}

/// Accepts `NODE_APP_INSTANCE` as a number, a string or `null`.
pub(crate) fn deserialize_instance<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawInstance>::deserialize(de)? {
        Some(RawInstance::Number(n)) => n.to_string(),
        Some(RawInstance::Text(s)) => s,
        None => default_instance(),
    })
}

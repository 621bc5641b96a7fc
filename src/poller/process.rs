//! Process listing model and the enumeration seam.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BridgeError;
use crate::events::{default_instance, deserialize_instance, ProcessStatus};

/// Resource usage sampled by PM2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Monit {
    /// CPU usage in percent.
    #[serde(default)]
    pub cpu: f64,
    /// Resident memory in bytes.
    #[serde(default)]
    pub memory: u64,
}

/// Subset of the PM2 environment the poll loop needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessEnv {
    #[serde(
        rename = "NODE_APP_INSTANCE",
        default = "default_instance",
        deserialize_with = "deserialize_instance"
    )]
    pub instance: String,
    pub status: ProcessStatus,
}

/// One entry of the PM2 process list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessInfo {
    pub name: String,
    #[serde(default)]
    pub pm_id: Option<u64>,
    #[serde(default)]
    pub monit: Monit,
    pub pm2_env: ProcessEnv,
}

impl ProcessInfo {
    #[inline]
    pub fn instance(&self) -> &str {
        &self.pm2_env.instance
    }

    #[inline]
    pub fn status(&self) -> &ProcessStatus {
        &self.pm2_env.status
    }
}

/// Source of the current process list.
///
/// Implementations may fail; the poll loop logs the error and tries again on
/// its next iteration.
#[async_trait]
pub trait ProcessList: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<ProcessInfo>, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_jlist_entry() {
        let info: ProcessInfo = serde_json::from_str(
            r#"{"pid": 4242, "name": "api", "pm_id": 0,
                "monit": {"memory": 52428800, "cpu": 12.5},
                "pm2_env": {"status": "online", "NODE_APP_INSTANCE": 0, "pm_uptime": 1}}"#,
        )
        .unwrap();
        assert_eq!(info.name, "api");
        assert_eq!(info.instance(), "0");
        assert_eq!(info.status(), &ProcessStatus::Online);
        assert_eq!(info.monit.memory, 52_428_800);
        assert_eq!(info.monit.cpu, 12.5);
    }

    #[test]
    fn missing_monit_reads_as_zero() {
        let info: ProcessInfo =
            serde_json::from_str(r#"{"name": "worker", "pm2_env": {"status": "stopped"}}"#)
                .unwrap();
        assert_eq!(info.monit, Monit::default());
        assert_eq!(info.instance(), "0");
    }
}

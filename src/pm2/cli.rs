//! # Pm2Cli: process enumeration through `pm2 jlist`.
//!
//! `pm2 jlist` prints the full process list as one JSON array. Some PM2
//! versions print notices before it, so parsing starts at the first line that
//! opens an array.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::BridgeError;
use crate::poller::{ProcessInfo, ProcessList};

/// [`ProcessList`] backed by the `pm2` executable.
#[derive(Debug, Clone)]
pub struct Pm2Cli {
    bin: String,
    home: Option<PathBuf>,
}

impl Pm2Cli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            home: None,
        }
    }

    /// Runs `pm2` against a specific `PM2_HOME`.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }
}

/// Parses `pm2 jlist` output.
pub fn parse_jlist(stdout: &[u8]) -> Result<Vec<ProcessInfo>, BridgeError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| BridgeError::enumerate(format!("jlist output is not UTF-8: {e}")))?;
    let start = if text.trim_start().starts_with('[') {
        0
    } else {
        text.find("\n[")
            .map(|i| i + 1)
            .ok_or_else(|| BridgeError::enumerate("jlist output contains no JSON array"))?
    };

    serde_json::from_str(text[start..].trim())
        .map_err(|e| BridgeError::enumerate(format!("jlist output is not a process list: {e}")))
}

#[async_trait]
impl ProcessList for Pm2Cli {
    async fn list(&self) -> Result<Vec<ProcessInfo>, BridgeError> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("jlist")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(home) = &self.home {
            cmd.env("PM2_HOME", home);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| BridgeError::enumerate(format!("failed to run {}: {e}", self.bin)))?;
        if !output.status.success() {
            return Err(BridgeError::enumerate(format!(
                "{} jlist exited with {}: {}",
                self.bin,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let processes = parse_jlist(&output.stdout)?;
        debug!(count = processes.len(), "pm2 jlist");
        Ok(processes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ProcessStatus;

    const JLIST: &str = r#"[{"name":"api","pm_id":0,"monit":{"memory":1000,"cpu":5},"pm2_env":{"status":"online","NODE_APP_INSTANCE":0}},{"name":"worker","pm_id":1,"monit":{"memory":2000,"cpu":10},"pm2_env":{"status":"stopped","NODE_APP_INSTANCE":1}}]"#;

    #[test]
    fn parses_plain_output() {
        let list = parse_jlist(JLIST.as_bytes()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].status(), &ProcessStatus::Stopped);
        assert_eq!(list[1].instance(), "1");
    }

    #[test]
    fn skips_leading_notices() {
        let out = format!(">>>> In-memory PM2 is out-of-date, do:\n>>>> $ pm2 update\n{JLIST}\n");
        assert_eq!(parse_jlist(out.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn empty_list_and_garbage() {
        assert!(parse_jlist(b"[]\n").unwrap().is_empty());
        assert_eq!(
            parse_jlist(b"daemon not running").unwrap_err().as_label(),
            "enumerate_failed"
        );
    }

    #[cfg(unix)]
    fn fake_pm2(dir: &std::path::Path, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("pm2");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_jlist_with_pm2_home() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_pm2(
            dir.path(),
            r#"[ "$1" = jlist ] || exit 3
printf '[{"name":"%s","pm2_env":{"status":"online"}}]' "$(basename "$PM2_HOME")""#,
        );

        let list = Pm2Cli::new(bin)
            .with_home(dir.path().join("home-a"))
            .list()
            .await
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "home-a");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_an_enumeration_error() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_pm2(dir.path(), "echo 'connect ECONNREFUSED' >&2; exit 1");

        let err = Pm2Cli::new(bin).list().await.unwrap_err();
        assert!(err.to_string().contains("ECONNREFUSED"));
    }

    #[tokio::test]
    async fn missing_binary_is_an_enumeration_error() {
        let err = Pm2Cli::new("/nonexistent/pm2-binary").list().await.unwrap_err();
        assert_eq!(err.as_label(), "enumerate_failed");
    }
}

//! Error types used by the bridge runtime and its adapters.
//!
//! [`BridgeError`] covers every failure the bridge can observe. None of them is
//! fatal to the event listener or the poll loop: callers log the error and keep
//! going. Only configuration errors and a stuck shutdown surface out of
//! [`Bridge::run`](crate::Bridge::run).
//!
//! The enum provides helper methods (`as_label`, `as_message`) for logging.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the bridge.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration could not be read, parsed or validated.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong with it.
        reason: String,
    },

    /// An I/O operation (socket, file, child process) failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The process manager could not enumerate its processes.
    #[error("process enumeration failed: {reason}")]
    Enumerate {
        /// The underlying error message.
        reason: String,
    },

    /// A frame or payload from the process manager bus could not be decoded.
    #[error("decode error: {reason}")]
    Decode {
        /// The underlying error message.
        reason: String,
    },

    /// The metrics backend refused a datagram.
    #[error("transport error: {reason}")]
    Transport {
        /// The underlying error message.
        reason: String,
    },

    /// Shutdown grace period was exceeded; some tasks were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks that did not stop in time.
        stuck: Vec<&'static str>,
    },
}

impl BridgeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use pm2_datadog::BridgeError;
    ///
    /// let err = BridgeError::Enumerate { reason: "pm2 not found".into() };
    /// assert_eq!(err.as_label(), "enumerate_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeError::Config { .. } => "config_invalid",
            BridgeError::Io(_) => "io_error",
            BridgeError::Enumerate { .. } => "enumerate_failed",
            BridgeError::Decode { .. } => "decode_failed",
            BridgeError::Transport { .. } => "transport_failed",
            BridgeError::GraceExceeded { .. } => "grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BridgeError::Config { reason } => format!("config: {reason}"),
            BridgeError::Io(e) => format!("io: {e}"),
            BridgeError::Enumerate { reason } => format!("enumerate: {reason}"),
            BridgeError::Decode { reason } => format!("decode: {reason}"),
            BridgeError::Transport { reason } => format!("transport: {reason}"),
            BridgeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        BridgeError::Config {
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        BridgeError::Decode {
            reason: reason.into(),
        }
    }

    pub(crate) fn enumerate(reason: impl Into<String>) -> Self {
        BridgeError::Enumerate {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(BridgeError::config("x").as_label(), "config_invalid");
        assert_eq!(BridgeError::decode("x").as_label(), "decode_failed");
        let io = BridgeError::from(std::io::Error::other("boom"));
        assert_eq!(io.as_label(), "io_error");
    }

    #[test]
    fn grace_message_lists_stuck_tasks() {
        let err = BridgeError::GraceExceeded {
            grace: Duration::from_secs(1),
            stuck: vec!["poller"],
        };
        assert!(err.as_message().contains("poller"));
    }
}

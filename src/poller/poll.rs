//! # Poller: periodic resource usage report.
//!
//! Each iteration lists the managed processes and emits:
//! ```text
//! gauge pm2.processes.installed = N
//! for each process:
//!     check pm2.processes.status  (status → check severity, optional)
//!     gauge pm2.processes.cpu     {application, instance}
//!     gauge pm2.processes.memory  {application, instance}
//! ```
//!
//! ## Scheduling
//! Fixed delay: the next iteration starts `interval` after the previous one
//! **finished**, so the period drifts by the iteration's own duration. A failed
//! iteration is logged and followed by the same delay; nothing is retried early.
//!
//! ## Cancellation
//! [`Poller::run`] exits as soon as the token is cancelled, whether it is
//! waiting on the process list or sleeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::process::{ProcessInfo, ProcessList};
use crate::error::BridgeError;
use crate::statsd::{
    CheckOptions, CheckStatus, MetricsSink, CHECK_STATUS, METRIC_CPU, METRIC_INSTALLED,
    METRIC_MEMORY,
};
use crate::tags::TagSet;

/// Periodic process poller.
pub struct Poller {
    lister: Arc<dyn ProcessList>,
    sink: Arc<dyn MetricsSink>,
    interval: Duration,
    status_checks: bool,
}

impl Poller {
    /// Creates a poller with status checks enabled.
    pub fn new(
        lister: Arc<dyn ProcessList>,
        sink: Arc<dyn MetricsSink>,
        interval: Duration,
    ) -> Self {
        Self {
            lister,
            sink,
            interval,
            status_checks: true,
        }
    }

    /// Enables or disables the per-process `pm2.processes.status` check.
    #[must_use]
    pub fn with_status_checks(mut self, enabled: bool) -> Self {
        self.status_checks = enabled;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one iteration: enumerate, then emit.
    ///
    /// Returns the number of processes reported. On enumeration failure
    /// nothing is emitted.
    pub async fn tick(&self) -> Result<usize, BridgeError> {
        let processes = self.lister.list().await?;
        self.report(&processes);
        Ok(processes.len())
    }

    fn report(&self, processes: &[ProcessInfo]) {
        let sink = self.sink.as_ref();
        sink.gauge(METRIC_INSTALLED, processes.len() as f64, &TagSet::new());

        for process in processes {
            if self.status_checks {
                sink.check(
                    CHECK_STATUS,
                    CheckStatus::from(process.status()),
                    &CheckOptions::default(),
                    &TagSet::application(&process.name),
                );
            }
            let tags = TagSet::for_process(process);
            sink.gauge(METRIC_CPU, process.monit.cpu, &tags);
            sink.gauge(METRIC_MEMORY, process.monit.memory as f64, &tags);
        }
    }

    /// Polls until `token` is cancelled.
    pub async fn run(self, token: CancellationToken) {
        info!(interval = ?self.interval, status_checks = self.status_checks, "poller started");
        let mut iteration: u64 = 0;

        loop {
            if token.is_cancelled() {
                break;
            }
            iteration += 1;

            select! {
                res = self.tick() => match res {
                    Ok(count) => debug!(iteration, processes = count, "poll iteration done"),
                    Err(e) => warn!(iteration, label = e.as_label(), error = %e, "poll iteration failed"),
                },
                _ = token.cancelled() => break,
            }

            let sleep = time::sleep(self.interval);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => break,
            }
        }
        info!(iterations = iteration, "poller stopped");
    }
}

//! # LogWriter: structured event trace
//!
//! A minimal subscriber that writes every bus event at `debug` level.
//! Useful to see exactly what PM2 publishes (`RUST_LOG=pm2_datadog=debug`).

use async_trait::async_trait;
use tracing::debug;

use crate::events::ProcessEvent;
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &ProcessEvent) {
        let p = &e.process;
        debug!(
            event = %e.event,
            at = e.at,
            manually = e.manually,
            name = %p.name,
            instance = %p.instance,
            status = %p.status,
            restart_time = p.restart_time,
            exit_code = ?p.exit_code,
            branch = ?p.branch(),
            "bus event"
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

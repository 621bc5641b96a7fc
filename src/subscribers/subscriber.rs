//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging event handlers into
//! the bridge. The DogStatsD dispatcher is one; a debug logger is another.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Architecture
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//!                                    └─► panic caught → error! log
//! ```
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only** and logs a warning.
//! - Events are processed sequentially (FIFO) per subscriber.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use pm2_datadog::{EventKind, ProcessEvent, Subscribe};
//!
//! struct Crashes;
//!
//! #[async_trait]
//! impl Subscribe for Crashes {
//!     async fn on_event(&self, ev: &ProcessEvent) {
//!         if ev.kind() == Some(EventKind::Exit) {
//!             // page someone, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "crashes" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::ProcessEvent;

/// Process event subscriber.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, not in the publisher context.
    async fn on_event(&self, event: &ProcessEvent);

    /// Returns the subscriber name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber.
    ///
    /// The runtime clamps capacity to a minimum of 1. Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

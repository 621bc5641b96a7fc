//! # Event subscribers for the bridge runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in subscribers consuming [`ProcessEvent`](crate::ProcessEvent)s
//! from the [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Pm2Bus ── publish(ProcessEvent) ──► Bus ──► bridge listener ──► SubscriberSet
//!                                                                     │
//!                                                        ┌────────────┴────────────┐
//!                                                        ▼                         ▼
//!                                               DatadogSubscriber             LogWriter
//!                                          (event/check/gauge/timing)      (debug trace)
//! ```

mod datadog;
mod log;
mod subscriber;
mod subscriber_set;

pub use datadog::{Clock, DatadogSubscriber};
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;

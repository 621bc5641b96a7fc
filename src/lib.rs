//! # pm2-datadog
//!
//! **pm2-datadog** forwards PM2 process activity to a DogStatsD agent.
//!
//! Two flows share one metrics client and one configuration:
//! - the **event listener** turns PM2 lifecycle events (`start`, `exit`,
//!   `restart`, ...) into Datadog events, service checks, gauges and timings;
//! - the **poll loop** lists the managed processes on a fixed delay and reports
//!   their count, CPU and memory (plus an optional status check).
//!
//! ## Architecture
//! ```text
//!   <PM2_HOME>/pub.sock                               `pm2 jlist`
//!   (axon amp frames)                                  (JSON array)
//!          │                                                │
//!          ▼                                                ▼
//!   ┌──────────────┐                               ┌──────────────────┐
//!   │    Pm2Bus    │                               │ Pm2Cli           │
//!   │ (reconnects  │                               │ (ProcessList)    │
//!   │  w/ backoff) │                               └────────┬─────────┘
//!   └──────┬───────┘                                        │
//!          │ publish(ProcessEvent)                          ▼
//!          ▼                                       ┌──────────────────┐
//! ┌─────────────────────────────────┐              │ Poller           │
//! │  Bus (broadcast channel)        │              │ (fixed delay)    │
//! │  capacity: Config::bus_capacity │              └────────┬─────────┘
//! └────────────────┬────────────────┘                       │
//!                  ▼                                        │
//!        ┌────────────────────┐                             │
//!        │  Bridge listener   │                             │
//!        └─────────┬──────────┘                             │
//!                  ▼                                        │
//!            SubscriberSet                                  │
//!           ┌──────┴───────────┐                            │
//!           ▼                  ▼                            │
//!   DatadogSubscriber      LogWriter                        │
//!           │                                               │
//!           ▼                                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  MetricsSink (DogStatsd: UDP datagrams + global tags)           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                       |
//! |-------------------|---------------------------------------------------------|------------------------------------------|
//! | **Events**        | Lifecycle payload model and in-process bus.             | [`ProcessEvent`], [`EventKind`], [`Bus`] |
//! | **Subscribers**   | Event dispatch to the metrics backend, debug tracing.   | [`Subscribe`], [`DatadogSubscriber`]     |
//! | **Polling**       | Process count, CPU, memory and status on an interval.   | [`Poller`], [`ProcessList`]              |
//! | **Backend**       | DogStatsD datagrams over UDP.                           | [`MetricsSink`], [`DogStatsd`]           |
//! | **PM2**           | Bus socket subscriber and `pm2 jlist` enumeration.      | [`Pm2Bus`], [`Pm2Cli`]                   |
//! | **Runtime**       | Wiring, signals and graceful shutdown.                  | [`Bridge`], [`Config`]                   |
//! | **Errors**        | Typed errors with stable labels.                        | [`BridgeError`]                          |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use pm2_datadog::{Bridge, Config, DogStatsd, Pm2Bus, Pm2Cli};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::load_from_str("port: 8125\nglobal_tags: [\"env:prod\"]\n")?;
//!
//!     let sink = DogStatsd::connect(&cfg.host, cfg.port, cfg.global_tags.clone()).await;
//!     let lister = Pm2Cli::new(cfg.pm2_bin.clone()).with_home(cfg.resolved_pm2_home());
//!     let source = Pm2Bus::new(cfg.pub_socket_path(), cfg.reconnect_backoff());
//!
//!     Bridge::new(cfg, Arc::new(sink), Arc::new(lister))
//!         .run(Some(source))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod poller;
mod statsd;
mod subscribers;

pub mod pm2;
pub mod tags;

// ---- Public re-exports ----

pub use self::core::{Bridge, Config};
pub use error::BridgeError;
pub use events::{Bus, EventKind, ProcessEvent, ProcessSnapshot, ProcessStatus, Versioning};
pub use pm2::{Pm2Bus, Pm2Cli};
pub use policies::BackoffPolicy;
pub use poller::{Monit, Poller, ProcessEnv, ProcessInfo, ProcessList};
pub use statsd::{
    AlertType, CheckOptions, CheckStatus, DogStatsd, EventOptions, MetricsSink, CHECK_APP_OK,
    CHECK_STATUS, METRIC_CPU, METRIC_INSTALLED, METRIC_MEMORY, METRIC_RESTART, METRIC_UPTIME,
};
pub use subscribers::{Clock, DatadogSubscriber, LogWriter, Subscribe, SubscriberSet};
pub use tags::{Tag, TagSet};

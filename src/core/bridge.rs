//! # Bridge: wires the event listener, the PM2 bus and the poll loop together.
//!
//! The [`Bridge`] owns the in-process [`Bus`], the subscribers fed from it and
//! the runtime [`CancellationToken`]. [`Bridge::run`] spawns every task under
//! that token and drives shutdown.
//!
//! ## Architecture
//! ```text
//! Pm2Bus (pub.sock) ── publish(ProcessEvent) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                                  ┌──────────┴──────────┐
//!                                                                  ▼                     ▼
//!                                                         DatadogSubscriber          LogWriter ...
//!                                                                  │
//!                                                                  ▼
//!                                                             MetricsSink
//!                                                                  ▲
//! Poller ── every interval: ProcessList::list() ── gauges/checks ──┘
//!
//! Shutdown path:
//!   OS signal or shutdown_token().cancel()
//!             └─► runtime token cancelled  → listener, Pm2Bus, Poller stop
//!             └─► wait_all_with_grace(cfg.grace):
//!                    ├─ Ok (all joined)  → Ok(())
//!                    └─ Timeout exceeded → abort, BridgeError::GraceExceeded
//! ```
//!
//! Events already received by the listener when the token fires are still
//! handed to subscribers; [`SubscriberSet::shutdown`] drains their queues.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::{select, sync::broadcast, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{shutdown, Config};
use crate::error::BridgeError;
use crate::events::{Bus, ProcessEvent};
use crate::pm2::Pm2Bus;
use crate::poller::{Poller, ProcessList};
use crate::statsd::MetricsSink;
use crate::subscribers::{DatadogSubscriber, LogWriter, Subscribe, SubscriberSet};

const TASK_LISTENER: &str = "listener";
const TASK_PM2_BUS: &str = "pm2-bus";
const TASK_POLLER: &str = "poller";

/// Runtime that forwards PM2 activity to a [`MetricsSink`].
pub struct Bridge {
    cfg: Config,
    bus: Bus,
    rx: broadcast::Receiver<ProcessEvent>,
    sink: Arc<dyn MetricsSink>,
    lister: Arc<dyn ProcessList>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    token: CancellationToken,
}

impl Bridge {
    /// Creates a bridge reporting to `sink` and polling `lister`.
    ///
    /// The bus receiver is attached here, so events published on
    /// [`bus`](Self::bus) before [`run`](Self::run) are kept (up to the bus
    /// capacity).
    pub fn new(cfg: Config, sink: Arc<dyn MetricsSink>, lister: Arc<dyn ProcessList>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let rx = bus.subscribe();
        let subscribers: Vec<Arc<dyn Subscribe>> = vec![
            Arc::new(DatadogSubscriber::new(Arc::clone(&sink))),
            Arc::new(LogWriter::new()),
        ];

        Self {
            cfg,
            bus,
            rx,
            sink,
            lister,
            subscribers,
            token: CancellationToken::new(),
        }
    }

    /// Adds a subscriber next to the built-in ones.
    #[must_use]
    pub fn with_subscriber(mut self, sub: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(sub);
        self
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Bus the lifecycle events travel on; publishing here feeds the subscribers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Token that stops the bridge when cancelled, same as an OS signal.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs until a termination signal, an explicit cancellation, or until
    /// every task has ended on its own.
    ///
    /// Without a `source` only the poll loop produces data; events can still be
    /// injected through [`bus`](Self::bus).
    pub async fn run(self, source: Option<Pm2Bus>) -> Result<(), BridgeError> {
        let Bridge {
            cfg,
            bus,
            rx,
            sink,
            lister,
            subscribers,
            token,
        } = self;

        let mut set = JoinSet::new();
        let mut running = Vec::new();

        let subs = SubscriberSet::new(subscribers);
        info!(subscribers = subs.len(), "bridge starting");
        spawn_task(
            &mut set,
            &mut running,
            TASK_LISTENER,
            listen(rx, subs, token.clone()),
        );

        match source {
            Some(source) => {
                info!(path = %source.path().display(), "listening to PM2 bus");
                spawn_task(
                    &mut set,
                    &mut running,
                    TASK_PM2_BUS,
                    source.run(bus.clone(), token.clone()),
                );
            }
            None => debug!("no PM2 bus source; events only come from the in-process bus"),
        }

        let poller =
            Poller::new(lister, sink, cfg.interval()).with_status_checks(cfg.status_checks);
        spawn_task(
            &mut set,
            &mut running,
            TASK_POLLER,
            poller.run(token.clone()),
        );

        select! {
            reason = shutdown_requested(&token) => {
                info!(reason, "shutdown requested");
                token.cancel();
                wait_all_with_grace(&mut set, running, cfg.grace()).await
            }
            _ = join_all(&mut set, &mut running) => {
                info!("all bridge tasks ended");
                Ok(())
            }
        }
    }
}

/// Spawns `fut` under `name`; a panic is logged and the task still reports its name.
fn spawn_task<F>(
    set: &mut JoinSet<&'static str>,
    running: &mut Vec<&'static str>,
    name: &'static str,
    fut: F,
) where
    F: Future<Output = ()> + Send + 'static,
{
    running.push(name);
    set.spawn(async move {
        if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
            error!(task = name, "bridge task panicked");
        }
        name
    });
}

/// Forwards bus events to the subscribers until `token` is cancelled.
async fn listen(
    mut rx: broadcast::Receiver<ProcessEvent>,
    subs: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        select! {
            res = rx.recv() => match res {
                Ok(ev) => subs.emit(&ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event listener lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = token.cancelled() => break,
        }
    }

    let drained = drain(&mut rx, &subs);
    subs.shutdown().await;
    debug!(drained, "event listener stopped");
}

/// Hands every event still buffered in `rx` to the subscribers.
///
/// A lag only skips the overwritten events; the rest are still delivered.
fn drain(rx: &mut broadcast::Receiver<ProcessEvent>, subs: &SubscriberSet) -> usize {
    let mut delivered = 0;
    loop {
        match rx.try_recv() {
            Ok(ev) => {
                subs.emit(&ev);
                delivered += 1;
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "event listener lagged while draining; events dropped");
            }
            Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                break
            }
        }
    }
    delivered
}

/// Resolves with the reason the bridge should stop.
///
/// If signal handlers cannot be installed only explicit cancellation stops
/// the bridge.
async fn shutdown_requested(token: &CancellationToken) -> &'static str {
    select! {
        res = shutdown::wait_for_shutdown_signal() => match res {
            Ok(signal) => signal,
            Err(e) => {
                error!(error = %e, "cannot install signal handlers");
                token.cancelled().await;
                "cancelled"
            }
        },
        _ = token.cancelled() => "cancelled",
    }
}

/// Joins tasks until the set is empty, removing each from `running`.
async fn join_all(set: &mut JoinSet<&'static str>, running: &mut Vec<&'static str>) {
    while let Some(res) = set.join_next().await {
        match res {
            Ok(name) => {
                running.retain(|n| *n != name);
                debug!(task = name, "bridge task finished");
            }
            Err(e) => warn!(error = %e, "bridge task aborted"),
        }
    }
}

/// Waits for all tasks within `grace`.
///
/// On timeout the remaining tasks are aborted and reported in
/// [`BridgeError::GraceExceeded`].
async fn wait_all_with_grace(
    set: &mut JoinSet<&'static str>,
    mut running: Vec<&'static str>,
    grace: Duration,
) -> Result<(), BridgeError> {
    let timed = tokio::time::timeout(grace, join_all(set, &mut running)).await;

    match timed {
        Ok(()) => {
            info!("all tasks stopped within grace");
            Ok(())
        }
        Err(_) => {
            set.abort_all();
            error!(?grace, stuck = ?running, "grace exceeded");
            Err(BridgeError::GraceExceeded {
                grace,
                stuck: running,
            })
        }
    }
}

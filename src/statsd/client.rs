//! # DogStatsD UDP client.
//!
//! [`DogStatsd`] owns a UDP socket connected to the agent. Every call encodes
//! one datagram and hands it to the kernel with a non-blocking `try_send`.
//! Nothing is buffered, retried or awaited.
//!
//! ## Failure semantics
//! - A send error (agent down, buffer full, ICMP unreachable reported on a later
//!   send) is logged at `error` level with the metric name and dropped.
//! - An agent host that does not resolve is not fatal: datagrams are dropped and
//!   logged the same way while resolution is retried in the background, at most
//!   once every [`RESOLVE_RETRY`].
//! - The caller never sees the error; the listener and the poll loop keep going.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use super::{format, CheckOptions, CheckStatus, EventOptions, MetricsSink};
use crate::error::BridgeError;
use crate::tags::TagSet;

/// Minimum delay between two resolution attempts of an unresolved agent.
pub const RESOLVE_RETRY: Duration = Duration::from_secs(5);

/// Agent address and, once resolved, the socket connected to it.
#[derive(Debug)]
struct Endpoint {
    host: String,
    port: u16,
    socket: RwLock<Option<UdpSocket>>,
    resolving: AtomicBool,
}

impl Endpoint {
    fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            socket: RwLock::new(None),
            resolving: AtomicBool::new(false),
        }
    }

    /// Resolves `host:port`, binds an ephemeral local socket of the same
    /// address family and connects it to the agent.
    async fn open(&self) -> Result<UdpSocket, BridgeError> {
        let (host, port) = (self.host.as_str(), self.port);
        let target = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| BridgeError::config(format!("cannot resolve {host}:{port}")))?;

        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        debug!(%target, "dogstatsd socket connected");
        Ok(socket)
    }

    /// Opens the socket and stores it; failures are logged.
    async fn establish(&self) -> bool {
        match self.open().await {
            Ok(socket) => {
                *self.socket.write().unwrap_or_else(PoisonError::into_inner) = Some(socket);
                true
            }
            Err(e) => {
                report(
                    &format!("{}:{}", self.host, self.port),
                    BridgeError::Transport {
                        reason: e.to_string(),
                    },
                );
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.socket
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Starts a background resolution unless one is already in flight.
    fn resolve_in_background(self: &Arc<Self>) {
        if self.resolving.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.resolving.store(false, Ordering::SeqCst);
            return;
        };

        let endpoint = Arc::clone(self);
        handle.spawn(async move {
            if endpoint.establish().await {
                info!(host = %endpoint.host, port = endpoint.port, "DogStatsD agent resolved");
            } else {
                tokio::time::sleep(RESOLVE_RETRY).await;
            }
            endpoint.resolving.store(false, Ordering::SeqCst);
        });
    }
}

fn report(metric: &str, err: BridgeError) {
    error!(
        metric,
        label = err.as_label(),
        error = %err,
        "error reporting to DogStatsD"
    );
}

/// Fire-and-forget DogStatsD client.
#[derive(Debug)]
pub struct DogStatsd {
    endpoint: Arc<Endpoint>,
    global_tags: Vec<String>,
}

impl DogStatsd {
    /// Connects to the agent at `host:port`.
    ///
    /// Never fails: if the agent cannot be reached yet, the failure is logged
    /// and the client keeps trying to resolve it while datagrams are dropped.
    pub async fn connect(host: &str, port: u16, global_tags: Vec<String>) -> Self {
        let endpoint = Arc::new(Endpoint::new(host, port));
        if !endpoint.establish().await {
            endpoint.resolving.store(true, Ordering::SeqCst);
            let retry = Arc::clone(&endpoint);
            tokio::spawn(async move {
                tokio::time::sleep(RESOLVE_RETRY).await;
                retry.resolving.store(false, Ordering::SeqCst);
            });
        }
        Self {
            endpoint,
            global_tags,
        }
    }

    /// Tags appended to every datagram.
    pub fn global_tags(&self) -> &[String] {
        &self.global_tags
    }

    /// Whether the agent address has been resolved.
    pub fn is_connected(&self) -> bool {
        self.endpoint.is_connected()
    }

    fn send(&self, metric: &str, datagram: String) {
        let guard = self
            .endpoint
            .socket
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(socket) => {
                if let Err(e) = socket.try_send(datagram.as_bytes()) {
                    report(
                        metric,
                        BridgeError::Transport {
                            reason: e.to_string(),
                        },
                    );
                }
            }
            None => {
                drop(guard);
                report(
                    metric,
                    BridgeError::Transport {
                        reason: format!(
                            "agent {}:{} not resolved",
                            self.endpoint.host, self.endpoint.port
                        ),
                    },
                );
                self.endpoint.resolve_in_background();
            }
        }
    }
}

impl MetricsSink for DogStatsd {
    fn event(&self, title: &str, text: Option<&str>, opts: &EventOptions, tags: &TagSet) {
        self.send(
            title,
            format::event(title, text, opts, tags, &self.global_tags),
        );
    }

    fn check(&self, name: &str, status: CheckStatus, opts: &CheckOptions, tags: &TagSet) {
        self.send(
            name,
            format::check(name, status, opts, tags, &self.global_tags),
        );
    }

    fn gauge(&self, name: &str, value: f64, tags: &TagSet) {
        self.send(name, format::gauge(name, value, tags, &self.global_tags));
    }

    fn timing(&self, name: &str, duration: Duration, tags: &TagSet) {
        self.send(
            name,
            format::timing(name, duration, tags, &self.global_tags),
        );
    }
}

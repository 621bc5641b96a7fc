//! # Pm2Bus: PM2 publish socket → in-process [`Bus`].
//!
//! Connects to `<PM2_HOME>/pub.sock`, decodes amp frames and republishes every
//! `process:event` message as a [`ProcessEvent`].
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► connect(pub.sock)                    (cancellable)
//!   │     ├─ Ok  ──► forward() until EOF / framing error / cancel
//!   │     └─ Err ──► warn
//!   ├─► delay = backoff.next(attempt)        (attempt resets after a good connection)
//!   └─► sleep(delay)                         (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - Messages on other topics are ignored.
//! - A payload that does not parse as a process event is logged and skipped;
//!   the connection stays up.
//! - A framing error drops the connection: the byte stream can no longer be trusted.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::{select, time};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::amp::{AmpArg, AmpCodec, AmpMessage};
use crate::error::BridgeError;
use crate::events::{Bus, ProcessEvent};
use crate::policies::BackoffPolicy;

/// Bus topic carrying process lifecycle events.
pub const PROCESS_EVENT_TOPIC: &str = "process:event";

/// Extracts a process event from a bus message.
///
/// `Ok(None)` for messages on other topics.
pub fn to_process_event(msg: AmpMessage) -> Result<Option<ProcessEvent>, BridgeError> {
    if msg.topic() != Some(PROCESS_EVENT_TOPIC) {
        return Ok(None);
    }
    match msg.args.into_iter().nth(1) {
        Some(AmpArg::Json(data)) => serde_json::from_value(data)
            .map(Some)
            .map_err(|e| BridgeError::decode(format!("process event payload: {e}"))),
        Some(_) => Err(BridgeError::decode("process event payload is not JSON")),
        None => Err(BridgeError::decode("process event without payload")),
    }
}

/// Reads amp frames from `stream` and publishes process events on `bus`.
///
/// Returns `Ok(())` on EOF or cancellation, `Err` on a framing error.
pub async fn forward<S>(stream: S, bus: &Bus, token: &CancellationToken) -> Result<(), BridgeError>
where
    S: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(stream, AmpCodec::default());
    loop {
        select! {
            next = frames.next() => match next {
                Some(Ok(msg)) => match to_process_event(msg) {
                    Ok(Some(ev)) => bus.publish(ev),
                    Ok(None) => {}
                    Err(e) => warn!(label = e.as_label(), error = %e, "skipping bus message"),
                },
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            },
            _ = token.cancelled() => return Ok(()),
        }
    }
}

/// Subscriber to the PM2 publish socket.
#[derive(Debug, Clone)]
pub struct Pm2Bus {
    path: PathBuf,
    backoff: BackoffPolicy,
}

impl Pm2Bus {
    pub fn new(path: impl Into<PathBuf>, backoff: BackoffPolicy) -> Self {
        Self {
            path: path.into(),
            backoff,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forwards events until `token` is cancelled, reconnecting as needed.
    #[cfg(unix)]
    pub async fn run(self, bus: Bus, token: CancellationToken) {
        use tokio::net::UnixStream;

        let mut attempt: u32 = 0;
        loop {
            if token.is_cancelled() {
                break;
            }

            let connected = select! {
                res = UnixStream::connect(&self.path) => res,
                _ = token.cancelled() => break,
            };
            match connected {
                Ok(stream) => {
                    info!(path = %self.path.display(), "PM2 connection established");
                    attempt = 0;
                    match forward(stream, &bus, &token).await {
                        Ok(()) if token.is_cancelled() => break,
                        Ok(()) => warn!(path = %self.path.display(), "PM2 bus closed"),
                        Err(e) => {
                            warn!(label = e.as_label(), error = %e, "PM2 bus stream corrupted")
                        }
                    }
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cannot connect to PM2 bus");
                }
            }

            let delay = self.backoff.next(attempt);
            attempt = attempt.saturating_add(1);
            debug!(?delay, attempt, "reconnecting to PM2 bus");

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => break,
            }
        }
        info!("PM2 bus listener stopped");
    }

    /// The PM2 bus is a unix socket; nothing to listen to elsewhere.
    #[cfg(not(unix))]
    pub async fn run(self, _bus: Bus, token: CancellationToken) {
        warn!(path = %self.path.display(), "PM2 bus requires unix sockets; event listener disabled");
        token.cancelled().await;
    }
}

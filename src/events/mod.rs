//! Process lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`ProcessEvent`], [`ProcessSnapshot`], [`ProcessStatus`] payload model
//! - [`EventKind`] closed set of event names the bridge reacts to
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `pm2::Pm2Bus` (decoded `process:event` messages).
//! - **Consumers**: `Bridge` listener, which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{EventKind, ProcessEvent, ProcessSnapshot, ProcessStatus, Versioning};

pub(crate) use event::{default_instance, deserialize_instance};

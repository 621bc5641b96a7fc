//! PM2 adapters.
//!
//! - [`amp`] codec for the axon frames PM2 publishes its bus with
//! - [`Pm2Bus`] publish-socket subscriber feeding the in-process [`Bus`](crate::Bus)
//! - [`Pm2Cli`] [`ProcessList`](crate::ProcessList) backed by `pm2 jlist`

pub mod amp;
mod bus;
mod cli;

pub use bus::{forward, to_process_event, Pm2Bus, PROCESS_EVENT_TOPIC};
pub use cli::{parse_jlist, Pm2Cli};

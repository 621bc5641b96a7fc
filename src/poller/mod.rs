//! Periodic process resource polling.
//!
//! - [`ProcessList`] enumeration seam (PM2 CLI in production)
//! - [`ProcessInfo`] one listed process with its sampled usage
//! - [`Poller`] fixed-delay loop emitting count, CPU, memory and status

mod poll;
mod process;

pub use poll::Poller;
pub use process::{Monit, ProcessEnv, ProcessInfo, ProcessList};

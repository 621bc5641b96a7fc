//! Runtime core: configuration, wiring and shutdown.
//!
//! The only public types from this module are [`Bridge`] and [`Config`].
//!
//! Internal modules:
//! - [`bridge`]: spawns the listener, the PM2 bus and the poll loop, drives shutdown;
//! - [`config`]: YAML configuration and its accessors;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod bridge;
mod config;
mod shutdown;

pub use bridge::Bridge;
pub use config::Config;

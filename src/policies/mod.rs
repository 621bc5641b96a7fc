//! Reconnect policies.
//!
//! The poll loop never retries: a failed iteration is simply followed by the
//! next one after the configured interval. Only the PM2 bus adapter reconnects,
//! and it spaces its attempts with [`BackoffPolicy`].
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=500ms, factor=2.0, max=30s.

mod backoff;

pub use backoff::BackoffPolicy;

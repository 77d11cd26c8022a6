//! Watches a single memory cgroup for kernel out-of-memory notifications.
//!
//! The watcher registers an eventfd against the cgroup's
//! `memory.oom_control` through `cgroup.event_control` (cgroup v1) and
//! reports every read of that eventfd to a sink until the cgroup is removed.

pub mod cgroup;
pub mod cli;
pub mod config;
pub mod error;
#[cfg(target_os = "linux")]
pub mod watcher;

pub use config::{OutputFormat, RegistrationPolicy, WatcherConfig};
pub use error::{Result, WatchError};
#[cfg(target_os = "linux")]
pub use watcher::{CancelHandle, OomWatcher, Termination, WatchSummary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

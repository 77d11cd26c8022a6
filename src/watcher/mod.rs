//! cgroup v1 OOM watcher
//!
//! ```text
//! setup      eventfd()
//! subscribe  cgroup.event_control <- "<eventfd> <memory.oom_control fd>"
//! loop       wait -> read 8 bytes -> emit -> stat(cgroup) ─┐
//!              ^                                           │ exists
//!              └───────────────────────────────────────────┘
//! ```
//!
//! The loop ends with success when the cgroup directory disappears or the
//! cancel handle fires, and with an error when the eventfd cannot be read.
//! Every exit path of [`OomWatcher::run`] releases all handles once.

pub mod channel;
pub mod sink;
pub mod state;
pub mod subscription;

pub use channel::{CancelHandle, EventChannel, Notifier, Wake};
pub use state::WatcherState;

use crate::cgroup::CgroupPaths;
use crate::config::WatcherConfig;
use crate::error::{Result, WatchError};
use std::io::{self, Write};
use tracing::{debug, info};

/// Why a watch ended successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    CgroupRemoved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub termination: Termination,
    /// Records written to the sink, one per successful read
    pub notifications: u64,
}

pub struct OomWatcher {
    config: WatcherConfig,
    state: WatcherState,
    cancel: Option<CancelHandle>,
}

impl OomWatcher {
    pub fn new(config: WatcherConfig) -> Result<Self> {
        config.validate()?;
        let state = WatcherState::new(CgroupPaths::new(&config.cgroup_path));
        Ok(Self {
            config,
            state,
            cancel: None,
        })
    }

    /// Let `cancel` interrupt the notification loop.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    /// Create the eventfd the kernel will signal.
    pub fn setup(&mut self) -> Result<()> {
        if self.state.event_fd.is_some() {
            return Err(WatchError::Config("eventfd already created".to_string()));
        }
        self.state.event_fd = Some(EventChannel::new()?);
        Ok(())
    }

    /// Register the eventfd for OOM notifications on the cgroup.
    pub fn subscribe(&mut self) -> Result<()> {
        subscription::subscribe(&mut self.state, self.config.registration)
    }

    /// Handle for incrementing the eventfd counter from outside the kernel.
    pub fn notifier(&self) -> Result<Notifier> {
        let channel = self
            .state
            .event_channel()
            .ok_or_else(|| WatchError::Config("eventfd has not been created".to_string()))?;
        channel
            .notifier()
            .map_err(|source| WatchError::ChannelCreation { source })
    }

    /// Drain notifications into `sink` until the cgroup goes away, the
    /// cancel handle fires, or a read fails.
    pub fn watch<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<WatchSummary> {
        if !self.state.is_subscribed() {
            return Err(WatchError::Config(
                "watch called before subscribe".to_string(),
            ));
        }
        let channel = self
            .state
            .event_channel()
            .ok_or_else(|| WatchError::Config("eventfd has been closed".to_string()))?;
        let cgroup = self.state.cgroup();
        let mut notifications = 0;

        let termination = loop {
            match channel.wait(self.cancel.as_ref(), self.config.probe_interval)? {
                Wake::Cancelled => {
                    info!(cgroup = %cgroup.root().display(), "watch cancelled");
                    break Termination::Cancelled;
                }
                Wake::TimedOut => {
                    if !cgroup.exists() {
                        break Termination::CgroupRemoved;
                    }
                }
                Wake::Notified => {
                    let counter = channel.read_counter()?;
                    info!(cgroup = %cgroup.root().display(), counter, "OOM notification");
                    sink::emit(sink, self.config.format, cgroup.root(), counter)?;
                    notifications += 1;

                    if !cgroup.exists() {
                        break Termination::CgroupRemoved;
                    }
                }
            }
        };

        if termination == Termination::CgroupRemoved {
            info!(cgroup = %cgroup.root().display(), "cgroup removed, stopping");
        }
        Ok(WatchSummary {
            termination,
            notifications,
        })
    }

    /// Release every handle still held. Returns how many were released.
    pub fn cleanup(&mut self) -> usize {
        self.state.cleanup()
    }

    /// Setup, subscribe and watch, then clean up whatever the outcome.
    pub fn run<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<WatchSummary> {
        let result = self
            .setup()
            .and_then(|_| self.subscribe())
            .and_then(|_| self.watch(sink));
        let released = self.cleanup();
        debug!(released, "watcher handles released");
        result
    }
}

/// Run a watcher for `config`, writing records to stdout.
pub fn watch_stdout(config: WatcherConfig, cancel: Option<CancelHandle>) -> Result<WatchSummary> {
    let mut watcher = OomWatcher::new(config)?;
    if let Some(cancel) = cancel {
        watcher = watcher.with_cancel(cancel);
    }
    let mut stdout = io::stdout().lock();
    watcher.run(&mut stdout)
}

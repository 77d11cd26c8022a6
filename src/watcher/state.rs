use super::channel::EventChannel;
use crate::cgroup::CgroupPaths;
use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use tracing::debug;

/// The handles one watcher owns for one cgroup.
///
/// `event_control_fd` only lives for the duration of the registration
/// write. `event_fd` and `oom_control_fd` stay open until [`cleanup`]
/// because the kernel keeps the subscription tied to both.
///
/// [`cleanup`]: WatcherState::cleanup
#[derive(Debug)]
pub struct WatcherState {
    pub(super) cgroup: CgroupPaths,
    pub(super) event_fd: Option<EventChannel>,
    pub(super) event_control_fd: Option<File>,
    pub(super) oom_control_fd: Option<File>,
    pub(super) subscription_message: Option<String>,
}

impl WatcherState {
    pub fn new(cgroup: CgroupPaths) -> Self {
        Self {
            cgroup,
            event_fd: None,
            event_control_fd: None,
            oom_control_fd: None,
            subscription_message: None,
        }
    }

    pub fn cgroup(&self) -> &CgroupPaths {
        &self.cgroup
    }

    pub fn event_channel(&self) -> Option<&EventChannel> {
        self.event_fd.as_ref()
    }

    pub fn event_fd(&self) -> Option<RawFd> {
        self.event_fd.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn event_control_fd(&self) -> Option<RawFd> {
        self.event_control_fd.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn oom_control_fd(&self) -> Option<RawFd> {
        self.oom_control_fd.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// `"<event_fd> <oom_control_fd>"` as written at registration
    pub fn subscription_message(&self) -> Option<&str> {
        self.subscription_message.as_deref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription_message.is_some()
    }

    pub fn open_handles(&self) -> usize {
        [
            self.event_fd.is_some(),
            self.event_control_fd.is_some(),
            self.oom_control_fd.is_some(),
        ]
        .into_iter()
        .filter(|open| *open)
        .count()
    }

    /// Close every handle still held. Safe to call any number of times;
    /// returns how many handles this call released.
    pub fn cleanup(&mut self) -> usize {
        let mut released = 0;
        if let Some(channel) = self.event_fd.take() {
            debug!(fd = channel.as_raw_fd(), "closing eventfd");
            drop(channel);
            released += 1;
        }
        if let Some(file) = self.event_control_fd.take() {
            debug!(fd = file.as_raw_fd(), "closing cgroup.event_control");
            drop(file);
            released += 1;
        }
        if let Some(file) = self.oom_control_fd.take() {
            debug!(fd = file.as_raw_fd(), "closing memory.oom_control");
            drop(file);
            released += 1;
        }
        released
    }
}

impl Drop for WatcherState {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = WatcherState::new(CgroupPaths::new("/tmp/t1"));
        assert_eq!(state.open_handles(), 0);
        assert!(!state.is_subscribed());
        assert!(state.event_fd().is_none());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut state = WatcherState::new(CgroupPaths::new("/tmp/t1"));
        state.event_fd = Some(EventChannel::new().unwrap());
        state.oom_control_fd = Some(File::open("/dev/null").unwrap());

        assert_eq!(state.open_handles(), 2);
        assert_eq!(state.cleanup(), 2);
        assert_eq!(state.cleanup(), 0);
        assert_eq!(state.open_handles(), 0);
    }
}

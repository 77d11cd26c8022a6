//! eventfd-backed notification primitive
//!
//! The kernel increments the eventfd counter once per OOM occurrence on the
//! subscribed cgroup. A blocking read returns the accumulated counter as an
//! 8-byte value and resets it to zero, so several occurrences between two
//! reads surface as a single read.

use crate::error::{ReadFailure, Result, WatchError};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::eventfd::{EfdFlags, EventFd};
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Size of an eventfd counter on the wire
pub const COUNTER_SIZE: usize = 8;

fn new_eventfd() -> Result<File> {
    let eventfd = EventFd::from_value_and_flags(0, EfdFlags::EFD_CLOEXEC)
        .map_err(|errno| WatchError::ChannelCreation {
            source: io::Error::from(errno),
        })?;
    Ok(File::from(OwnedFd::from(eventfd)))
}

fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(t) => {
            let ms = t.as_millis().min(i32::MAX as u128) as i32;
            PollTimeout::try_from(ms).unwrap_or(PollTimeout::MAX)
        }
    }
}

/// Result of one wait on the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The eventfd is readable (or in an error state the read will report)
    Notified,
    /// The cancel handle fired
    Cancelled,
    /// The poll interval elapsed with nothing to read
    TimedOut,
}

/// The eventfd the kernel signals on OOM
#[derive(Debug)]
pub struct EventChannel {
    file: File,
}

impl EventChannel {
    pub fn new() -> Result<Self> {
        let file = new_eventfd()?;
        debug!(fd = file.as_raw_fd(), "eventfd created");
        Ok(Self { file })
    }

    /// A second handle on the same counter, for hosts and tests that stand
    /// in for the kernel.
    pub fn notifier(&self) -> io::Result<Notifier> {
        Ok(Notifier {
            file: self.file.try_clone()?,
        })
    }

    /// Block until the channel is readable, `cancel` fires, or `timeout`
    /// elapses. `None` waits forever.
    pub fn wait(&self, cancel: Option<&CancelHandle>, timeout: Option<Duration>) -> Result<Wake> {
        let mut fds = vec![PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
        if let Some(cancel) = cancel {
            fds.push(PollFd::new(cancel.file.as_fd(), PollFlags::POLLIN));
        }
        let timeout = poll_timeout(timeout);

        let ready = loop {
            match poll(&mut fds, timeout) {
                Ok(n) => break n,
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    return Err(WatchError::ChannelRead {
                        fd: self.as_raw_fd(),
                        reason: ReadFailure::Io(io::Error::from(errno)),
                    })
                }
            }
        };

        let cancelled = fds
            .get(1)
            .and_then(|fd| fd.revents())
            .is_some_and(|revents| revents.contains(PollFlags::POLLIN));
        if cancelled {
            Ok(Wake::Cancelled)
        } else if ready == 0 {
            Ok(Wake::TimedOut)
        } else {
            Ok(Wake::Notified)
        }
    }

    /// Drain the counter. Anything other than a full 8-byte read is an error.
    pub fn read_counter(&self) -> Result<u64> {
        let mut buf = [0u8; COUNTER_SIZE];
        let read = loop {
            match (&self.file).read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(WatchError::ChannelRead {
                        fd: self.as_raw_fd(),
                        reason: ReadFailure::Io(e),
                    })
                }
            }
        };
        decode_counter(&buf, read).map_err(|reason| WatchError::ChannelRead {
            fd: self.as_raw_fd(),
            reason,
        })
    }
}

impl AsRawFd for EventChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

fn decode_counter(buf: &[u8; COUNTER_SIZE], read: usize) -> std::result::Result<u64, ReadFailure> {
    if read != COUNTER_SIZE {
        return Err(ReadFailure::ShortRead(read));
    }
    Ok(u64::from_ne_bytes(*buf))
}

/// Increments the counter of an [`EventChannel`] the way the kernel does.
#[derive(Debug)]
pub struct Notifier {
    file: File,
}

impl Notifier {
    pub fn notify(&self, count: u64) -> io::Result<()> {
        (&self.file).write_all(&count.to_ne_bytes())
    }
}

/// Wakes a blocked watcher without a kernel notification.
///
/// Backed by its own eventfd that is never drained, so cancellation stays
/// in effect once requested.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    file: Arc<File>,
}

impl CancelHandle {
    pub fn new() -> Result<Self> {
        Ok(Self {
            file: Arc::new(new_eventfd()?),
        })
    }

    pub fn cancel(&self) -> io::Result<()> {
        (&*self.file).write_all(&1u64.to_ne_bytes())
    }
}

impl AsRawFd for CancelHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_counter() {
        let buf = 3u64.to_ne_bytes();
        assert_eq!(decode_counter(&buf, 8).unwrap(), 3);
    }

    #[test]
    fn test_decode_short_read() {
        let buf = [0u8; 8];
        assert!(matches!(
            decode_counter(&buf, 5),
            Err(ReadFailure::ShortRead(5))
        ));
        assert!(matches!(
            decode_counter(&buf, 0),
            Err(ReadFailure::ShortRead(0))
        ));
    }

    #[test]
    fn test_notifications_coalesce() {
        let channel = EventChannel::new().unwrap();
        let notifier = channel.notifier().unwrap();
        notifier.notify(1).unwrap();
        notifier.notify(1).unwrap();
        notifier.notify(1).unwrap();

        assert_eq!(channel.wait(None, None).unwrap(), Wake::Notified);
        assert_eq!(channel.read_counter().unwrap(), 3);
    }

    #[test]
    fn test_poll_timeout_conversion() {
        assert_eq!(poll_timeout(None), PollTimeout::NONE);
        assert_eq!(
            poll_timeout(Some(Duration::from_millis(250))),
            PollTimeout::try_from(250i32).unwrap()
        );
        assert_eq!(
            poll_timeout(Some(Duration::from_secs(u64::MAX))),
            PollTimeout::try_from(i32::MAX).unwrap()
        );
    }

    #[test]
    fn test_wait_times_out_when_idle() {
        let channel = EventChannel::new().unwrap();
        let wake = channel.wait(None, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(wake, Wake::TimedOut);
    }

    #[test]
    fn test_cancel_wins_over_notification() {
        let channel = EventChannel::new().unwrap();
        let cancel = CancelHandle::new().unwrap();
        channel.notifier().unwrap().notify(1).unwrap();
        cancel.cancel().unwrap();

        assert_eq!(channel.wait(Some(&cancel), None).unwrap(), Wake::Cancelled);
        // sticky
        assert_eq!(channel.wait(Some(&cancel), None).unwrap(), Wake::Cancelled);
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let channel = EventChannel::new().unwrap();
        let cancel = CancelHandle::new().unwrap();
        let remote = cancel.clone();

        let handle = std::thread::spawn(move || remote.cancel().unwrap());
        assert_eq!(channel.wait(Some(&cancel), None).unwrap(), Wake::Cancelled);
        handle.join().unwrap();
    }
}

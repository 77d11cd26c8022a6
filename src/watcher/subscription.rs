//! Registration of an eventfd against `memory.oom_control`
//!
//! cgroup v1 subscription handshake:
//!
//! ```text
//! open  <cgroup>/cgroup.event_control   O_WRONLY
//! open  <cgroup>/memory.oom_control     O_RDONLY   (kept open)
//! write "<eventfd> <oom_control fd>"    -> cgroup.event_control
//! close cgroup.event_control
//! ```

use super::state::WatcherState;
use crate::config::RegistrationPolicy;
use crate::error::{Result, WatchError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use tracing::{debug, info, warn};

/// Fixed upper bound for the registration message
pub const SUBSCRIPTION_CAPACITY: usize = 25;

pub fn encode_subscription(
    event_fd: RawFd,
    oom_control_fd: RawFd,
    capacity: usize,
) -> Result<String> {
    let message = format!("{} {}", event_fd, oom_control_fd);
    if message.len() > capacity {
        return Err(WatchError::Encoding { message, capacity });
    }
    Ok(message)
}

fn open_control(path: &Path, write: bool) -> Result<File> {
    OpenOptions::new()
        .read(!write)
        .write(write)
        .open(path)
        .map_err(|source| WatchError::CgroupUnavailable {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `message` to the registration endpoint in a single `write`.
///
/// The kernel parses the whole buffer at once, so a partial write leaves the
/// registration half-formed. Under [`RegistrationPolicy::Strict`] a failed
/// write is `CgroupUnavailable` and a short one `RegistrationIncomplete`;
/// under [`RegistrationPolicy::Lenient`] both are logged and the number of
/// bytes actually written is returned.
pub fn register<W: Write + ?Sized>(
    endpoint: &mut W,
    path: &Path,
    message: &str,
    policy: RegistrationPolicy,
) -> Result<usize> {
    let expected = message.len();
    match endpoint.write(message.as_bytes()) {
        Ok(n) if n == expected => Ok(n),
        Ok(n) => {
            let err = WatchError::RegistrationIncomplete {
                path: path.to_path_buf(),
                written: n,
                expected,
            };
            match policy {
                RegistrationPolicy::Strict => Err(err),
                RegistrationPolicy::Lenient => {
                    warn!("{}; continuing", err);
                    Ok(n)
                }
            }
        }
        Err(source) => match policy {
            RegistrationPolicy::Strict => Err(WatchError::CgroupUnavailable {
                path: path.to_path_buf(),
                source,
            }),
            RegistrationPolicy::Lenient => {
                warn!(
                    "registration write to {} failed: {}; continuing",
                    path.display(),
                    source
                );
                Ok(0)
            }
        },
    }
}

pub(super) fn subscribe(state: &mut WatcherState, policy: RegistrationPolicy) -> Result<()> {
    if state.is_subscribed() {
        return Err(WatchError::Config(format!(
            "{} is already subscribed",
            state.cgroup.root().display()
        )));
    }
    let event_fd = state
        .event_fd()
        .ok_or_else(|| WatchError::Config("eventfd has not been created".to_string()))?;

    let event_control_path = state.cgroup.event_control();
    let event_control = open_control(&event_control_path, true)?;
    state.event_control_fd = Some(event_control);

    let oom_control = open_control(&state.cgroup.oom_control(), false)?;
    let oom_control_fd = oom_control.as_raw_fd();
    state.oom_control_fd = Some(oom_control);

    let message = encode_subscription(event_fd, oom_control_fd, SUBSCRIPTION_CAPACITY)?;
    debug!(message = %message, "registering OOM listener");

    let written = match state.event_control_fd.as_mut() {
        Some(file) => register(file, &event_control_path, &message, policy),
        None => Ok(0),
    };
    state.subscription_message = Some(message);
    written?;

    if let Some(file) = state.event_control_fd.take() {
        drop(file);
    }

    info!(
        cgroup = %state.cgroup.root().display(),
        event_fd,
        oom_control_fd,
        "subscribed to OOM notifications"
    );
    Ok(())
}

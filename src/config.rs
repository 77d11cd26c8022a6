use crate::error::{Result, WatchError};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// How a notification is written to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `oom <counter>` per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Raw 8-byte native-endian counter
    Binary,
}

/// What to do when the write to `cgroup.event_control` is short or fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPolicy {
    /// Fail the watcher
    #[default]
    Strict,
    /// Log a warning and keep watching
    Lenient,
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub cgroup_path: PathBuf,
    pub format: OutputFormat,
    /// Re-check the cgroup this often while no notification arrives
    pub probe_interval: Option<Duration>,
    pub registration: RegistrationPolicy,
}

impl WatcherConfig {
    pub fn new(cgroup_path: impl Into<PathBuf>) -> Self {
        Self {
            cgroup_path: cgroup_path.into(),
            format: OutputFormat::default(),
            probe_interval: None,
            registration: RegistrationPolicy::default(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = Some(interval);
        self
    }

    pub fn with_registration(mut self, policy: RegistrationPolicy) -> Self {
        self.registration = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cgroup_path.as_os_str().is_empty() {
            return Err(WatchError::Config("cgroup path is empty".to_string()));
        }
        if self.probe_interval == Some(Duration::ZERO) {
            return Err(WatchError::Config(
                "probe interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub mod commands;

use crate::config::{OutputFormat, RegistrationPolicy, WatcherConfig};
use crate::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "oomwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Report kernel out-of-memory notifications for a memory cgroup", long_about = None)]
pub struct Cli {
    #[arg(value_name = "CGROUP", help = "Memory cgroup directory to watch")]
    pub cgroup: PathBuf,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, help = "Notification output format")]
    pub format: OutputFormat,

    #[arg(long, value_name = "MS", help = "Re-check that the cgroup exists this often while idle")]
    pub probe_interval_ms: Option<u64>,

    #[arg(long, help = "Keep watching when the registration write is short or fails")]
    pub lenient_registration: bool,
}

impl Cli {
    pub fn watcher_config(&self) -> Result<WatcherConfig> {
        let mut config = WatcherConfig::new(&self.cgroup).with_format(self.format);
        if let Some(ms) = self.probe_interval_ms {
            config = config.with_probe_interval(Duration::from_millis(ms));
        }
        if self.lenient_registration {
            config = config.with_registration(RegistrationPolicy::Lenient);
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_path() {
        let cli = Cli::try_parse_from(["oomwatch", "/tmp/t1"]).unwrap();
        let config = cli.watcher_config().unwrap();
        assert_eq!(config.cgroup_path, PathBuf::from("/tmp/t1"));
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.registration, RegistrationPolicy::Strict);
    }

    #[test]
    fn test_path_is_required() {
        assert!(Cli::try_parse_from(["oomwatch"]).is_err());
    }

    #[test]
    fn test_only_one_path() {
        assert!(Cli::try_parse_from(["oomwatch", "/tmp/a", "/tmp/b"]).is_err());
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "oomwatch",
            "--format",
            "json",
            "--probe-interval-ms",
            "250",
            "--lenient-registration",
            "/tmp/t1",
        ])
        .unwrap();
        let config = cli.watcher_config().unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.probe_interval, Some(Duration::from_millis(250)));
        assert_eq!(config.registration, RegistrationPolicy::Lenient);
    }

    #[test]
    fn test_zero_probe_interval() {
        let cli = Cli::try_parse_from(["oomwatch", "--probe-interval-ms", "0", "/tmp/t1"]).unwrap();
        assert!(cli.watcher_config().is_err());
    }
}

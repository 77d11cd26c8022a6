use crate::cli::Cli;
use crate::watcher::{self, CancelHandle, WatchSummary};
use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

/// Run the watcher on a blocking thread until it ends on its own or Ctrl+C
/// asks it to stop.
pub async fn handle_watch(cli: Cli) -> Result<WatchSummary> {
    let config = cli.watcher_config()?;
    info!(cgroup = %config.cgroup_path.display(), format = ?config.format, "Watching cgroup");

    let cancel = CancelHandle::new()?;
    let remote = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || watcher::watch_stdout(config, Some(remote)));

    let joined = tokio::select! {
        joined = &mut task => joined,
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    info!("Shutdown signal received");
                    cancel.cancel().context("Failed to wake the watcher")?;
                }
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            }
            task.await
        }
    };

    let summary = joined.context("Watcher thread panicked")??;
    Ok(summary)
}

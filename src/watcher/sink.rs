use crate::config::OutputFormat;
use crate::error::{Result, WatchError};
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;

#[derive(Serialize)]
struct OomRecord<'a> {
    event: &'static str,
    /// Lossy: cgroup names are arbitrary bytes, JSON strings are not
    cgroup: Cow<'a, str>,
    counter: u64,
}

fn encode(format: OutputFormat, cgroup: &Path, counter: u64) -> io::Result<Vec<u8>> {
    match format {
        OutputFormat::Text => Ok(format!("oom {}\n", counter).into_bytes()),
        OutputFormat::Json => {
            let record = OomRecord {
                event: "oom",
                cgroup: cgroup.to_string_lossy(),
                counter,
            };
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            Ok(line)
        }
        OutputFormat::Binary => Ok(counter.to_ne_bytes().to_vec()),
    }
}

/// Write one record for one read of the event channel and flush it, so the
/// consumer sees it before the watcher blocks again.
pub fn emit<W: Write + ?Sized>(
    sink: &mut W,
    format: OutputFormat,
    cgroup: &Path,
    counter: u64,
) -> Result<()> {
    let record = encode(format, cgroup, counter).map_err(|source| WatchError::Sink { source })?;
    sink.write_all(&record)
        .and_then(|_| sink.flush())
        .map_err(|source| WatchError::Sink { source })
}

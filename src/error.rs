use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("eventfd() failed")]
    ChannelCreation {
        #[source]
        source: io::Error,
    },

    #[error("cgroup control file {} is unavailable", path.display())]
    CgroupUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("subscription message {message:?} does not fit in {capacity} bytes")]
    Encoding { message: String, capacity: usize },

    #[error("could not read from eventfd {fd}: {reason}")]
    ChannelRead { fd: i32, reason: ReadFailure },

    #[error("registration write to {} incomplete: {written} of {expected} bytes", path.display())]
    RegistrationIncomplete {
        path: PathBuf,
        written: usize,
        expected: usize,
    },

    #[error("could not write notification to sink")]
    Sink {
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a read from the event primitive was rejected.
#[derive(Error, Debug)]
pub enum ReadFailure {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("short read of {0} bytes, expected 8")]
    ShortRead(usize),
}

pub type Result<T> = std::result::Result<T, WatchError>;

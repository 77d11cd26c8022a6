//! Control-file layout of a v1 memory cgroup
//!
//! The watcher never creates or configures cgroups. It only needs to know
//! where the kernel exposes the two files used for OOM subscription and
//! whether the cgroup directory is still there.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Registration endpoint: `<eventfd> <target fd> [args]` is written here
pub const EVENT_CONTROL_FILE: &str = "cgroup.event_control";

/// Control file the OOM event is anchored to
pub const OOM_CONTROL_FILE: &str = "memory.oom_control";

/// Paths beneath a single cgroup directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupPaths {
    root: PathBuf,
}

impl CgroupPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cgroup directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn event_control(&self) -> PathBuf {
        self.root.join(EVENT_CONTROL_FILE)
    }

    pub fn oom_control(&self) -> PathBuf {
        self.root.join(OOM_CONTROL_FILE)
    }

    /// Existence check run after every notification.
    ///
    /// A `stat` failure of any kind counts as "gone": the kernel removes the
    /// directory when the cgroup is deleted, and nothing useful can be
    /// watched through a path we can no longer stat.
    pub fn exists(&self) -> bool {
        match fs::metadata(&self.root) {
            Ok(_) => true,
            Err(e) => {
                debug!("cgroup {} no longer present: {}", self.root.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_paths() {
        let paths = CgroupPaths::new("/sys/fs/cgroup/memory/job-1");
        assert_eq!(
            paths.event_control(),
            PathBuf::from("/sys/fs/cgroup/memory/job-1/cgroup.event_control")
        );
        assert_eq!(
            paths.oom_control(),
            PathBuf::from("/sys/fs/cgroup/memory/job-1/memory.oom_control")
        );
    }

    #[test]
    fn test_trailing_slash() {
        let paths = CgroupPaths::new("/tmp/t1/");
        assert_eq!(
            paths.oom_control(),
            PathBuf::from("/tmp/t1/memory.oom_control")
        );
    }

    #[test]
    fn test_exists_follows_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cgroup = dir.path().join("t1");
        fs::create_dir(&cgroup).unwrap();

        let paths = CgroupPaths::new(&cgroup);
        assert!(paths.exists());

        fs::remove_dir(&cgroup).unwrap();
        assert!(!paths.exists());
    }
}

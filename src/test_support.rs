use crate::locks::{LivenessProbe, LockRecord, NoProbe, Semaphore, SemaphoreConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Probe with a fixed answer, for deterministic staleness tests.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedProbe(pub Option<bool>);

impl LivenessProbe for FixedProbe {
    fn is_alive(&self, _pid: u32) -> Option<bool> {
        self.0
    }
}

/// A lock path inside a private temporary directory.
pub(crate) struct TestLock {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TestLock {
    pub(crate) fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resource.lock");
        Self {
            _temp_dir: temp_dir,
            path,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Semaphore with a short retry interval and no liveness probe.
    pub(crate) fn semaphore(&self) -> Semaphore {
        self.semaphore_with(fast_config()).with_probe(NoProbe)
    }

    pub(crate) fn semaphore_with(&self, config: SemaphoreConfig) -> Semaphore {
        Semaphore::new(&self.path, config).unwrap()
    }

    /// Write a record directly, as a foreign process would.
    pub(crate) fn write_record(&self, record: &LockRecord) {
        std::fs::write(&self.path, record.serialize()).unwrap();
    }

    pub(crate) fn write_raw(&self, contents: &str) {
        std::fs::write(&self.path, contents).unwrap();
    }

    pub(crate) fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap()
    }

    pub(crate) fn exists(&self) -> bool {
        self.path.exists()
    }
}

pub(crate) fn fast_config() -> SemaphoreConfig {
    SemaphoreConfig {
        stale_timeout: Some(Duration::from_secs(60)),
        retry_interval: Duration::from_millis(10),
        acquire_timeout: None,
    }
}

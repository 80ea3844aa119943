//! Exclusive-create primitive for lock files.
//!
//! The whole semaphore rests on one filesystem guarantee: creating a name that
//! must not already exist is atomic. Nothing in this module ever checks for a
//! file and then creates it.
//!
//! # Implementation Strategy
//!
//! 1. Write the contents to a uniquely named temporary file in the same
//!    directory and sync it to disk (fsync).
//! 2. Hard-link the temporary file to the lock path. `link(2)` fails with
//!    `EEXIST` atomically, so the lock file only ever becomes visible with its
//!    complete contents.
//! 3. Remove the temporary name.
//!
//! Some filesystems (FAT, certain FUSE and network mounts) refuse hard links.
//! There we fall back to `O_CREAT | O_EXCL` (`create_new`) followed by a write
//! and fsync; a racing reader may then briefly observe an empty or partial
//! file, which the record parser rejects as unparseable.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Outcome of an exclusive create that did not fail with an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The file did not exist and now holds exactly the given contents.
    Created,
    /// Some other writer already owns the path; nothing was changed.
    AlreadyExists,
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Atomically create `path` containing `contents`, failing if it exists.
///
/// `AlreadyExists` is not an error: the caller decides what contention means.
///
/// # Example
///
/// ```no_run
/// use filesem::fs::{create_exclusive, CreateOutcome};
///
/// match create_exclusive("/tmp/job.lock", b"pid=1\ntimestamp=0\n")? {
///     CreateOutcome::Created => println!("ours"),
///     CreateOutcome::AlreadyExists => println!("taken"),
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn create_exclusive<P: AsRef<Path>>(path: P, contents: &[u8]) -> io::Result<CreateOutcome> {
    let path = path.as_ref();
    let temp_path = generate_temp_path(path)?;

    write_and_sync(&temp_path, contents)?;
    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);

    match linked {
        Ok(()) => {
            sync_parent(path);
            Ok(CreateOutcome::Created)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "hard link refused, falling back to create_new");
            create_new_fallback(path, contents)
        }
    }
}

/// Remove `path` only if its current contents equal `expected`.
///
/// Returns `Ok(true)` when the file was removed, `Ok(false)` when it was
/// already gone or now holds different contents. A racing writer can still
/// slip in between the comparison and the unlink; callers treat a removal as
/// a hint and always re-run the exclusive create afterwards.
pub fn remove_if_unchanged<P: AsRef<Path>>(path: P, expected: &[u8]) -> io::Result<bool> {
    let path = path.as_ref();

    let current = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if current != expected {
        return Ok(false);
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove `path` unconditionally. Returns `Ok(false)` if it did not exist.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> io::Result<bool> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn create_new_fallback(path: &Path, contents: &[u8]) -> io::Result<CreateOutcome> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(CreateOutcome::AlreadyExists);
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = file.write_all(contents).and_then(|()| file.sync_all()) {
        // Never leave a half-written record behind as a phantom holder
        let _ = fs::remove_file(path);
        return Err(e);
    }

    sync_parent(path);
    Ok(CreateOutcome::Created)
}

/// Generate a unique temporary path in the same directory as the target.
///
/// Pattern: `.{filename}.{pid}.{nanos}.{counter}.tmp`
fn generate_temp_path(target: &Path) -> io::Result<PathBuf> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let filename = target.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid lock file name: '{}'", target.display()),
        )
    })?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

    Ok(parent.join(format!(
        ".{}.{}.{}.{}.tmp",
        filename,
        std::process::id(),
        nanos,
        counter
    )))
}

/// Write content to a fresh file and sync it to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    if let Err(e) = file.write_all(content).and_then(|()| file.sync_all()) {
        let _ = fs::remove_file(path);
        return Err(e);
    }

    Ok(())
}

/// Best-effort directory sync so the new entry survives a crash.
#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Ok(dir) = fs::File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_create_exclusive_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.lock");

        let outcome = create_exclusive(&path, b"pid=1\ntimestamp=2\n").unwrap();

        assert_eq!(outcome, CreateOutcome::Created);
        assert_eq!(fs::read_to_string(&path).unwrap(), "pid=1\ntimestamp=2\n");
    }

    #[test]
    fn test_create_exclusive_existing_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.lock");
        fs::write(&path, "pid=7\ntimestamp=8\n").unwrap();

        let outcome = create_exclusive(&path, b"pid=1\ntimestamp=2\n").unwrap();

        assert_eq!(outcome, CreateOutcome::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "pid=7\ntimestamp=8\n");
    }

    #[test]
    fn test_create_exclusive_cleans_up_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.lock");

        create_exclusive(&path, b"first").unwrap();
        create_exclusive(&path, b"second").unwrap();

        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_create_exclusive_missing_parent_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("job.lock");

        let err = create_exclusive(&path, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_create_exclusive_only_one_winner() {
        let temp_dir = TempDir::new().unwrap();
        let path = Arc::new(temp_dir.path().join("race.lock"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let contents = format!("writer={}\n", i);
                    create_exclusive(path.as_path(), contents.as_bytes()).unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == CreateOutcome::Created)
            .count();

        assert_eq!(winners, 1);
        assert!(fs::read_to_string(path.as_path()).unwrap().starts_with("writer="));
    }

    #[test]
    fn test_generate_temp_path_is_hidden_sibling() {
        let target = Path::new("/some/path/job.lock");
        let temp = generate_temp_path(target).unwrap();

        assert_eq!(temp.parent().unwrap(), Path::new("/some/path"));
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".job.lock."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_generate_temp_path_is_unique() {
        let target = Path::new("job.lock");
        let a = generate_temp_path(target).unwrap();
        let b = generate_temp_path(target).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.parent().unwrap(), Path::new("."));
    }

    #[test]
    fn test_remove_if_unchanged_matching() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.lock");
        fs::write(&path, "pid=1\n").unwrap();

        assert!(remove_if_unchanged(&path, b"pid=1\n").unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_if_unchanged_different_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.lock");
        fs::write(&path, "pid=2\n").unwrap();

        assert!(!remove_if_unchanged(&path, b"pid=1\n").unwrap());
        assert!(path.exists());
    }

    #[test]
    fn test_remove_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.lock");
        fs::write(&path, "anything").unwrap();

        assert!(remove_if_exists(&path).unwrap());
        assert!(!remove_if_exists(&path).unwrap());
    }

    #[test]
    fn test_remove_if_unchanged_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.lock");

        assert!(!remove_if_unchanged(&path, b"pid=1\n").unwrap());
    }
}

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock serialising writers of one TODO document.
///
/// Held through a `.<file>.lock` sibling using flock (Unix). The lock is
/// released when the value is dropped. The lock file itself stays on disk:
/// unlinking it would let a waiting process lock an orphaned inode.
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: another td process is writing this document")]
    Timeout { path: PathBuf },
    #[error("lock error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FileLock {
    /// Lock `doc_path`, waiting up to `timeout` for another holder to finish
    pub fn acquire(doc_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = lock_path_for(doc_path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::CreateError {
                path: lock_path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    return Ok(FileLock {
                        _file: file,
                        path: lock_path,
                    });
                }
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => {
                    return Err(LockError::Timeout { path: lock_path });
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `dir/2026-todo.md` → `dir/.2026-todo.md.lock`
pub fn lock_path_for(doc_path: &Path) -> PathBuf {
    let name = doc_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    doc_path.with_file_name(format!(".{}.lock", name))
}

/// Try to acquire an exclusive flock on the file (non-blocking)
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_is_hidden_sibling() {
        let path = Path::new("/data/users/alice/2026-todo.md");
        assert_eq!(
            lock_path_for(path),
            PathBuf::from("/data/users/alice/.2026-todo.md.lock")
        );
    }

    #[test]
    fn test_acquire_and_release_lock() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("2026-todo.md");

        let lock = FileLock::acquire(&doc, Duration::from_secs(1)).unwrap();
        assert!(lock.path().exists());
        drop(lock);

        let again = FileLock::acquire(&doc, Duration::from_secs(1));
        assert!(again.is_ok());
    }

    #[test]
    fn test_lock_contention() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("2026-todo.md");

        let _held = FileLock::acquire(&doc, Duration::from_secs(1)).unwrap();
        let second = FileLock::acquire(&doc, Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }

    #[test]
    fn test_documents_lock_independently() {
        let tmp = TempDir::new().unwrap();
        let _a = FileLock::acquire(&tmp.path().join("2025-todo.md"), Duration::from_secs(1)).unwrap();
        let b = FileLock::acquire(&tmp.path().join("2026-todo.md"), Duration::from_millis(50));
        assert!(b.is_ok());
    }
}

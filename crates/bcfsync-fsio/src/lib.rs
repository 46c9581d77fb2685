//! # bcfsync-fsio
//!
//! File primitives shared by the on-disk stores:
//! - [`FileLock`]: an exclusive `<target>.lock` file held for one
//!   read/modify/write cycle and removed on drop
//! - [`write_atomic`]: replace a file through a fsynced sibling temp file
//!   and a rename
//!
//! Locks fail closed: a lock file left behind by a crashed writer keeps
//! reporting [`LockError::Busy`] until someone removes it.

use chrono::Utc;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// `<target>.lock`.
pub fn lock_path(target: &Path) -> PathBuf {
    sibling(target, ".lock")
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock busy: {lock_path}")]
    Busy { lock_path: String },

    #[error("failed to acquire lock {lock_path}: {message}")]
    Io { lock_path: String, message: String },
}

/// Exclusive lock on `target`, released when dropped.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
    _file: File,
}

impl FileLock {
    pub fn acquire(target: &Path) -> Result<Self, LockError> {
        let lock_path = lock_path(target);
        let lock_io = |message: String| LockError::Io {
            lock_path: lock_path.display().to_string(),
            message,
        };

        if let Some(parent) = non_empty_parent(&lock_path) {
            fs::create_dir_all(parent).map_err(|e| lock_io(e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(LockError::Busy {
                lock_path: lock_path.display().to_string(),
            }),
            Err(err) => Err(lock_io(err.to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// An I/O failure while replacing `path`.
#[derive(Debug, thiserror::Error)]
#[error("{}: {error}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    pub error: io::Error,
}

/// Replace the file at `path` with `payload`.
///
/// Missing parent directories are created. The payload goes to a sibling
/// temp file that is fsynced and renamed over `path`, so readers see
/// either the old or the new contents. A failed write removes the temp
/// file and leaves `path` untouched.
pub fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), WriteError> {
    let fail = |target: &Path, error: io::Error| WriteError {
        path: target.to_path_buf(),
        error,
    };

    let parent = non_empty_parent(path);
    if let Some(parent) = parent {
        fs::create_dir_all(parent).map_err(|e| fail(parent, e))?;
    }

    let tmp_path = tmp_write_path(path);
    let written = File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(payload)?;
            file.sync_all()
        })
        .map_err(|e| fail(&tmp_path, e))
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| fail(path, e)));
    if let Err(error) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    if let Some(parent) = parent {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| fail(parent, e))?;
    }
    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    sibling(path, &format!(".tmp.{}.{}", std::process::id(), unique))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

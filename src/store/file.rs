//! Crash-safe artifact files.
//!
//! Writes go to a uniquely named temp file next to the target, are flushed
//! and fsynced, then renamed over the target. A reader never observes a
//! half-written table.
//!
//! # Locking
//! - [`ArtifactLock`] holds an exclusive lock on `<dir>/.weapon_roster.lock`
//! - The lock is released when the guard is dropped
//! - Acquisition is non-blocking; a held lock is reported as [`StoreError::Locked`]

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::StoreError;

const LOCK_FILE_NAME: &str = ".weapon_roster.lock";

fn io_err(path: &Path, e: &IoError) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Atomically replaces `path` with `bytes`, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, &e))?;
    }
    let mut writer = AtomicWriter::new(path.to_path_buf()).map_err(|e| io_err(path, &e))?;
    writer.write_all(bytes).map_err(|e| io_err(path, &e))?;
    writer.finalize().map_err(|e| io_err(path, &e))
}

/// Temp-file writer that becomes visible at its final path on `finalize`.
///
/// Dropping an unfinalized writer removes the temp file.
pub struct AtomicWriter {
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl AtomicWriter {
    pub fn new(final_path: PathBuf) -> IoResult<Self> {
        let temp_path = final_path.with_extension(format!("tmp.{}", Uuid::new_v4()));
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(Self {
            temp_path: Some(temp_path),
            final_path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> IoResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "writer already consumed"))?;
        writer.write_all(bytes)
    }

    /// Flush, fsync, rename. After this returns the file is durable.
    pub fn finalize(mut self) -> IoResult<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "writer already consumed"))?;
        let temp_path = self
            .temp_path
            .take()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "temp_path already consumed"))?;

        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        if let Err(e) = fs::rename(&temp_path, &self.final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        self.writer.take();
        if let Some(ref temp_path) = self.temp_path {
            if temp_path.exists() {
                let _ = fs::remove_file(temp_path);
            }
        }
    }
}

/// Exclusive lock over an output directory.
#[derive(Debug)]
pub struct ArtifactLock {
    _file: File,
    path: PathBuf,
}

impl ArtifactLock {
    /// Takes the lock on `dir`, creating the directory if needed.
    pub fn acquire(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, &e))?;
        let lock_path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_err(&lock_path, &e))?;

        match Self::try_lock(&file) {
            Ok(()) => Ok(Self {
                _file: file,
                path: lock_path,
            }),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Err(StoreError::Locked {
                path: dir.to_path_buf(),
            }),
            Err(e) => Err(io_err(&lock_path, &e)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn try_lock(file: &File) -> IoResult<()> {
        use std::os::unix::io::AsRawFd;

        let fd = file.as_raw_fd();
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if result != 0 {
            let errno = IoError::last_os_error();
            if errno.raw_os_error() == Some(libc::EWOULDBLOCK) {
                return Err(IoError::new(
                    ErrorKind::WouldBlock,
                    "output directory is locked by another sweep",
                ));
            }
            return Err(errno);
        }
        Ok(())
    }

    #[cfg(windows)]
    fn try_lock(file: &File) -> IoResult<()> {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::Foundation::HANDLE;
        use windows_sys::Win32::Storage::FileSystem::{
            LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
        };

        let handle = file.as_raw_handle() as HANDLE;
        let result = unsafe {
            let mut overlapped = std::mem::zeroed::<windows_sys::Win32::System::IO::OVERLAPPED>();
            LockFileEx(
                handle,
                LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
                0,
                1,
                0,
                &mut overlapped,
            )
        };
        if result == 0 {
            let err = IoError::last_os_error();
            return Err(IoError::new(
                ErrorKind::WouldBlock,
                format!("output directory is locked by another sweep: {err}"),
            ));
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn try_lock(_file: &File) -> IoResult<()> {
        Err(IoError::new(
            ErrorKind::Unsupported,
            "file locking not supported on this platform",
        ))
    }
}

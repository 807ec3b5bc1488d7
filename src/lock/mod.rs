//! Advisory Lock Module
//!
//! Cooperative file locking for store access. The store itself never
//! locks; the calling package manager brackets its work instead — a
//! shared lock around lookups, an exclusive lock around anything that
//! rewrites the file. [`LockFile`] is the RAII handle for one held lock.
//!
//! ## Why a sibling lock file
//!
//! Every mutation replaces the store file by renaming a finished
//! temporary over it, which swaps the inode. A lock taken on the store
//! file itself would silently keep guarding the *old* inode while other
//! processes lock the new one. Locks therefore live on a sibling path
//! (`<store>.lock`) that is never replaced; [`crate::Store`] derives it.
//!
//! ## Semantics
//!
//! `flock(2)` advisory locking: any number of shared holders, or one
//! exclusive holder. Blocking acquisition first probes non-blocking so
//! contention can be logged before the wait. The lock releases when the
//! handle drops (closing the descriptor releases the flock); the lock
//! file itself is left in place — removing it would race new lockers.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Imports
// ------------------------------------------------------------------------------------------------

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use libc::{LOCK_EX, LOCK_NB, LOCK_SH, c_int};
use tracing::debug;

// ------------------------------------------------------------------------------------------------
// LockFile
// ------------------------------------------------------------------------------------------------

/// A held advisory lock. Dropping the handle releases the lock.
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Acquires a shared lock, blocking while an exclusive holder exists.
    pub fn shared<P: AsRef<Path>>(path: P) -> io::Result<LockFile> {
        LockFile::lock_blocking(path.as_ref(), LOCK_SH)
    }

    /// Acquires an exclusive lock, blocking while any holder exists.
    ///
    /// The holder's process id is written into the lock file, so a stuck
    /// lock can be traced to its owner.
    pub fn exclusive<P: AsRef<Path>>(path: P) -> io::Result<LockFile> {
        let locked = LockFile::lock_blocking(path.as_ref(), LOCK_EX)?;
        locked.file.set_len(0)?;
        writeln!(&locked.file, "{}", std::process::id())?;
        Ok(locked)
    }

    /// Attempts a shared lock without blocking. `None` means an
    /// exclusive holder exists.
    pub fn try_shared<P: AsRef<Path>>(path: P) -> io::Result<Option<LockFile>> {
        LockFile::lock_nonblocking(path.as_ref(), LOCK_SH)
    }

    /// Attempts an exclusive lock without blocking. `None` means some
    /// holder exists.
    pub fn try_exclusive<P: AsRef<Path>>(path: P) -> io::Result<Option<LockFile>> {
        LockFile::lock_nonblocking(path.as_ref(), LOCK_EX)
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_blocking(path: &Path, operation: c_int) -> io::Result<LockFile> {
        let file = LockFile::open(path)?;
        match LockFile::flock(&file, operation | LOCK_NB) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                debug!("Lock on {} held elsewhere, waiting", path.display());
                LockFile::flock(&file, operation)?;
            }
            Err(error) => return Err(error),
        }
        Ok(LockFile {
            file,
            path: path.to_path_buf(),
        })
    }

    fn lock_nonblocking(path: &Path, operation: c_int) -> io::Result<Option<LockFile>> {
        let file = LockFile::open(path)?;
        match LockFile::flock(&file, operation | LOCK_NB) {
            Ok(()) => Ok(Some(LockFile {
                file,
                path: path.to_path_buf(),
            })),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).write(true).open(path)
    }

    fn flock(file: &File, operation: c_int) -> io::Result<()> {
        let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

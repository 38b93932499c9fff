use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::process::is_process_alive;

/// An advisory lock held by exclusively creating a sentinel file.
///
/// The file contains the PID of the holder. On unix the holder also keeps an
/// exclusive `flock` on the sentinel for as long as the guard lives, and a contender
/// only removes a stale sentinel while holding that same `flock`, so two contenders
/// can never both clear a lock and then both acquire it. Dropping the guard deletes
/// the file, so the lock is released on every exit path, including early returns
/// and panics.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    _file: File,
}

/// What a contender found when inspecting an existing lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// Another live holder has the lock.
    Held,
    /// The lock file disappeared or was replaced while looking at it.
    Gone,
    /// The lock belonged to the given dead process and was removed.
    Removed(u32),
}

impl FileLock {
    /// Acquires the lock at `path`, polling every `poll` while another holder has it.
    ///
    /// A lock file whose recorded PID belongs to a dead process is removed and the
    /// acquisition retried. Gives up with [`StoreError::LockTimeout`] after `timeout`.
    pub fn acquire(path: &Path, poll: Duration, timeout: Duration) -> Result<Self, StoreError> {
        let lock_err = |source| StoreError::Lock { path: path.to_path_buf(), source };
        let started = Instant::now();
        loop {
            match create_exclusive(path) {
                Ok(mut file) => {
                    if let Err(source) = sys::hold(&file).and_then(|()| write_pid(&mut file)) {
                        drop(file);
                        let _ = fs::remove_file(path);
                        return Err(lock_err(source));
                    }
                    debug!(path = %path.display(), "storage lock acquired");
                    return Ok(Self { path: path.to_path_buf(), _file: file });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    match sys::clear_stale(path).map_err(lock_err)? {
                        Probe::Removed(pid) => {
                            warn!(path = %path.display(), pid, "removed stale storage lock");
                            continue;
                        }
                        Probe::Gone => continue,
                        Probe::Held => {}
                    }

                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(StoreError::LockTimeout { path: path.to_path_buf(), waited });
                    }
                    thread::sleep(poll);
                }
                Err(source) => return Err(lock_err(source)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // unlinked while the flock is still held; the descriptor closes afterwards
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release storage lock");
        }
    }
}

fn create_exclusive(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn write_pid(file: &mut File) -> io::Result<()> {
    file.write_all(std::process::id().to_string().as_bytes())?;
    file.sync_all()
}

/// Returns the holder PID if the lock file names a process that no longer exists.
///
/// Unreadable, empty or garbled lock files are treated as held: the holder may be
/// between creating the file and writing its PID.
fn dead_holder(mut file: &File) -> Option<u32> {
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    let pid = contents.trim().parse::<u32>().ok()?;
    (!is_process_alive(pid)).then_some(pid)
}

#[cfg(unix)]
mod sys {
    use std::fs::{self, File};
    use std::io;
    use std::os::unix::fs::MetadataExt;
    use std::os::unix::io::AsRawFd;
    use std::path::Path;

    use super::{Probe, dead_holder};

    /// Blocks until the exclusive `flock` on a freshly created sentinel is taken.
    ///
    /// Only a contender inspecting the file can hold it, and only briefly.
    pub(super) fn hold(file: &File) -> io::Result<()> {
        loop {
            // SAFETY: the descriptor is owned by `file` and open for the whole call.
            if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    fn try_hold(file: &File) -> io::Result<bool> {
        // SAFETY: the descriptor is owned by `file` and open for the whole call.
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
            Ok(false)
        } else {
            Err(err)
        }
    }

    /// Whether `path` still names the inode `file` was opened from.
    pub(super) fn same_file(file: &File, path: &Path) -> io::Result<bool> {
        let opened = file.metadata()?;
        match fs::metadata(path) {
            Ok(current) => Ok(opened.dev() == current.dev() && opened.ino() == current.ino()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Removes the lock at `path` if its holder is dead.
    ///
    /// A live holder keeps the `flock`, so failing to take it means the lock is held.
    /// Holding it while checking that `path` still names the same inode guarantees the
    /// file removed is the stale one and not a lock created since by someone else.
    pub(super) fn clear_stale(path: &Path) -> io::Result<Probe> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Probe::Gone),
            Err(err) => return Err(err),
        };
        if !try_hold(&file)? {
            return Ok(Probe::Held);
        }
        if !same_file(&file, path)? {
            return Ok(Probe::Gone);
        }
        let Some(pid) = dead_holder(&file) else {
            return Ok(Probe::Held);
        };

        match fs::remove_file(path) {
            Ok(()) => Ok(Probe::Removed(pid)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Probe::Gone),
            Err(err) => Err(err),
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use std::fs::{self, File};
    use std::io;
    use std::path::Path;

    use super::{Probe, dead_holder};

    pub(super) fn hold(_file: &File) -> io::Result<()> {
        Ok(())
    }

    /// Without `flock` the check and the removal are separate steps, so two contenders
    /// seeing the same stale lock can race; the exclusive create still serializes the
    /// common case.
    pub(super) fn clear_stale(path: &Path) -> io::Result<Probe> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Probe::Gone),
            Err(err) => return Err(err),
        };
        let Some(pid) = dead_holder(&file) else {
            return Ok(Probe::Held);
        };
        drop(file);

        match fs::remove_file(path) {
            Ok(()) => Ok(Probe::Removed(pid)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Probe::Gone),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn test_acquire_writes_pid_and_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json.lock");

        let lock = FileLock::acquire(&path, POLL, Duration::from_secs(1)).unwrap();
        assert_eq!(lock.path(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), std::process::id().to_string());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_live_holder_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json.lock");
        fs::write(&path, std::process::id().to_string()).unwrap();

        let err = FileLock::acquire(&path, POLL, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout { .. }));
        // the foreign lock is left alone
        assert!(path.exists());
    }

    #[test]
    fn test_garbled_lock_is_treated_as_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json.lock");
        fs::write(&path, "").unwrap();

        let err = FileLock::acquire(&path, POLL, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_lock_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json.lock");

        fs::write(&path, dead_pid().to_string()).unwrap();

        let lock = FileLock::acquire(&path, POLL, Duration::from_secs(1)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), std::process::id().to_string());
        drop(lock);
    }

    #[cfg(unix)]
    fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[cfg(unix)]
    #[test]
    fn test_live_holder_is_not_removed_despite_dead_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json.lock");

        // a contender that read the previous, dead holder's PID must still find the
        // current holder's flock in place and leave its lock alone
        let holder = FileLock::acquire(&path, POLL, Duration::from_secs(1)).unwrap();
        fs::write(&path, dead_pid().to_string()).unwrap();

        assert_eq!(sys::clear_stale(&path).unwrap(), Probe::Held);
        let err = FileLock::acquire(&path, POLL, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout { .. }));
        assert!(path.exists());

        drop(holder);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_replaced_lock_is_not_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json.lock");
        fs::write(&path, dead_pid().to_string()).unwrap();

        // the stale file is cleared by someone else and a new one takes its place
        let stale = File::open(&path).unwrap();
        fs::remove_file(&path).unwrap();
        fs::write(&path, dead_pid().to_string()).unwrap();

        assert!(!sys::same_file(&stale, &path).unwrap());
        assert!(sys::same_file(&File::open(&path).unwrap(), &path).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_contenders_on_stale_lock_hold_it_one_at_a_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Barrier};

        const CONTENDERS: usize = 4;

        for _ in 0..20 {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("store.json.lock");
            fs::write(&path, dead_pid().to_string()).unwrap();

            let holders = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(CONTENDERS));
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|_| {
                    let (path, holders, barrier) = (path.clone(), holders.clone(), barrier.clone());
                    thread::spawn(move || {
                        barrier.wait();
                        let lock = FileLock::acquire(&path, POLL, Duration::from_secs(5)).unwrap();
                        assert_eq!(holders.fetch_add(1, Ordering::SeqCst), 0);
                        thread::sleep(Duration::from_millis(5));
                        holders.fetch_sub(1, Ordering::SeqCst);
                        drop(lock);
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_waits_for_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json.lock");

        let first = FileLock::acquire(&path, POLL, Duration::from_secs(1)).unwrap();
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            drop(first);
        });

        let second = FileLock::acquire(&path, POLL, Duration::from_secs(5)).unwrap();
        releaser.join().unwrap();
        drop(second);
        assert!(!path.exists());
    }
}

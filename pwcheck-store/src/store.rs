use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::StoreError;
use crate::lock::FileLock;

/// How often a contended lock file is polled.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for another process to release the lock file.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// A password saved under a label.
///
/// Labels are unique ignoring case; the casing of the first save is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPassword {
    pub label: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, deserialize_with = "null_as_empty")]
    entries: Vec<StoredPassword>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<StoredPassword>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<StoredPassword>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Credential store backed by a single JSON file.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    guard: Mutex<()>,
}

impl CredentialStore {
    /// Opens the store at `path`, creating parent directories (owner-only) and an empty
    /// document if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(StoreError::Validation("storage path cannot be empty".to_string()));
        }

        if let Some(parent) = parent_dir(path) {
            create_private_dir(parent)
                .map_err(StoreError::io("failed to create storage directory"))?;
        }

        let mut lock_path = path.as_os_str().to_os_string();
        lock_path.push(".lock");

        let store = Self {
            path: path.to_path_buf(),
            lock_path: PathBuf::from(lock_path),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            guard: Mutex::new(()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Overrides how long an operation waits for another process's lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves `password` under `label`, replacing the password of an existing entry
    /// whose label matches ignoring case.
    pub fn save(&self, label: &str, password: &str) -> Result<StoredPassword, StoreError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(StoreError::Validation("label cannot be empty".to_string()));
        }
        if password.is_empty() {
            return Err(StoreError::Validation("password cannot be empty".to_string()));
        }

        let _guard = self.lock_process();
        let _lock = self.lock_file()?;

        let mut entries = self.read_entries()?;
        let now = Utc::now();

        let record = match entries.iter().position(|entry| same_label(&entry.label, label)) {
            Some(index) => {
                let existing = &mut entries[index];
                existing.password = password.to_string();
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let record = StoredPassword {
                    label: label.to_string(),
                    password: password.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                entries.push(record.clone());
                record
            }
        };

        self.write_entries(entries)?;
        info!(label = %record.label, "password saved");
        Ok(record)
    }

    /// Returns every entry sorted by label, ignoring case.
    pub fn list(&self) -> Result<Vec<StoredPassword>, StoreError> {
        let _guard = self.lock_process();
        let _lock = self.lock_file()?;

        let mut entries = self.read_entries()?;
        entries.sort_by_cached_key(|entry| entry.label.to_lowercase());
        Ok(entries)
    }

    /// Writes an empty document if the store file does not exist yet.
    ///
    /// The document is written like any other update, under both locks and through a
    /// renamed temporary file, so a concurrent reader never sees it half written.
    fn initialize(&self) -> Result<(), StoreError> {
        if self.exists()? {
            return Ok(());
        }

        let _guard = self.lock_process();
        let _lock = self.lock_file()?;
        if self.exists()? {
            return Ok(());
        }
        self.persist_with(|file| write_document(file, &Document::default()))
    }

    fn exists(&self) -> Result<bool, StoreError> {
        self.path.try_exists().map_err(StoreError::io("failed to inspect storage file"))
    }

    fn lock_process(&self) -> MutexGuard<'_, ()> {
        // the mutex guards no data, so a poisoned lock is still usable
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_file(&self) -> Result<FileLock, StoreError> {
        FileLock::acquire(&self.lock_path, LOCK_POLL_INTERVAL, self.lock_timeout)
    }

    fn read_entries(&self) -> Result<Vec<StoredPassword>, StoreError> {
        let data = fs::read_to_string(&self.path)
            .map_err(StoreError::io("failed to read storage file"))?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: Document = serde_json::from_str(&data).map_err(StoreError::Decode)?;
        Ok(document.entries)
    }

    fn write_entries(&self, entries: Vec<StoredPassword>) -> Result<(), StoreError> {
        let document = Document { entries };
        self.persist_with(|file| write_document(file, &document))
    }

    /// Writes through `write` into a temporary file next to the store, then renames it
    /// over the store. If anything fails the temporary file is removed and the store is
    /// left untouched.
    fn persist_with<F>(&self, write: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut File) -> Result<(), StoreError>,
    {
        let dir = parent_dir(&self.path).unwrap_or(Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix("password-store-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(StoreError::io("failed to create temporary storage file"))?;

        write(temp.as_file_mut())?;
        temp.as_file().sync_all().map_err(StoreError::io("failed to flush storage data"))?;
        restrict_permissions(temp.as_file())
            .map_err(StoreError::io("failed to set storage permissions"))?;

        // closes the descriptor; the path is still removed on drop until persisted
        let temp_path = temp.into_temp_path();
        temp_path.persist(&self.path).map_err(|err| StoreError::Io {
            context: "failed to replace storage file",
            source: err.error,
        })
    }
}

fn same_label(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

fn write_document(file: &mut File, document: &Document) -> Result<(), StoreError> {
    serde_json::to_writer_pretty(&mut *file, document).map_err(StoreError::Encode)?;
    file.write_all(b"\n").map_err(StoreError::io("failed to write storage data"))
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}

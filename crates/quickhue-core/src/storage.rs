//! Byte-oriented persistent key/value backends.
//!
//! [`PersistentStorage`] is the narrow interface the settings store needs
//! from non-volatile memory: look up a value's length, copy it out, replace
//! it, or delete it. Two backends are provided:
//!
//! - [`MemoryStorage`]: process-local, with write failure injection for tests.
//! - [`FileStorage`]: a JSON file, rewritten atomically on every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

/// Largest value a single key may hold.
pub const MAX_VALUE_LEN: usize = 256;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The value exceeds [`MAX_VALUE_LEN`].
    #[error("value of {len} bytes exceeds the {max} byte limit")]
    ValueTooLarge { len: usize, max: usize },

    /// A stored value does not have the expected size.
    #[error("stored value is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The backend refused the write.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Failed to create the storage directory.
    #[error("failed to create storage directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Non-volatile key/value storage.
pub trait PersistentStorage: Send + Sync {
    /// Length of the value stored under `key`, or `None` if never written.
    fn stored_len(&self, key: u32) -> Option<usize>;

    /// Copy the value stored under `key` into `buf`.
    ///
    /// Copies at most `buf.len()` bytes and returns how many were copied, or
    /// `None` if the key was never written.
    fn read_bytes(&self, key: u32, buf: &mut [u8]) -> Option<usize>;

    /// Replace the value stored under `key`.
    fn write_bytes(&self, key: u32, value: &[u8]) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: u32) -> StorageResult<()>;

    /// Read a little-endian `i32`.
    fn read_i32(&self, key: u32) -> StorageResult<Option<i32>> {
        let Some(len) = self.stored_len(key) else {
            return Ok(None);
        };
        if len != 4 {
            return Err(StorageError::LengthMismatch {
                expected: 4,
                actual: len,
            });
        }
        let mut buf = [0u8; 4];
        Ok(self
            .read_bytes(key, &mut buf)
            .map(|_| i32::from_le_bytes(buf)))
    }

    /// Write a little-endian `i32`.
    fn write_i32(&self, key: u32, value: i32) -> StorageResult<()> {
        self.write_bytes(key, &value.to_le_bytes())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn copy_out(values: &BTreeMap<u32, Vec<u8>>, key: u32, buf: &mut [u8]) -> Option<usize> {
    let value = values.get(&key)?;
    let n = value.len().min(buf.len());
    buf[..n].copy_from_slice(&value[..n]);
    Some(n)
}

fn check_len(value: &[u8]) -> StorageResult<()> {
    if value.len() > MAX_VALUE_LEN {
        return Err(StorageError::ValueTooLarge {
            len: value.len(),
            max: MAX_VALUE_LEN,
        });
    }
    Ok(())
}

/// In-memory storage.
///
/// # Example
///
/// ```
/// use quickhue_core::{MemoryStorage, PersistentStorage};
///
/// let storage = MemoryStorage::new();
/// storage.write_bytes(2, b"10.0.0.2").unwrap();
/// assert_eq!(storage.stored_len(2), Some(8));
///
/// // Next write fails, the one after succeeds
/// storage.set_write_failures(1);
/// assert!(storage.write_bytes(2, b"10.0.0.3").is_err());
/// assert!(storage.write_bytes(2, b"10.0.0.3").is_ok());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<u32, Vec<u8>>>,
    remaining_write_failures: AtomicU32,
    write_count: AtomicU32,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` writes or deletes.
    pub fn set_write_failures(&self, count: u32) {
        self.remaining_write_failures.store(count, Ordering::Relaxed);
    }

    /// Number of successful writes and deletes so far.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Raw stored bytes for `key`.
    pub fn get_raw(&self, key: u32) -> Option<Vec<u8>> {
        lock(&self.values).get(&key).cloned()
    }

    fn take_failure(&self) -> StorageResult<()> {
        let injected = self
            .remaining_write_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StorageError::WriteFailed("injected failure".to_string()));
        }
        Ok(())
    }
}

impl PersistentStorage for MemoryStorage {
    fn stored_len(&self, key: u32) -> Option<usize> {
        lock(&self.values).get(&key).map(Vec::len)
    }

    fn read_bytes(&self, key: u32, buf: &mut [u8]) -> Option<usize> {
        copy_out(&lock(&self.values), key, buf)
    }

    fn write_bytes(&self, key: u32, value: &[u8]) -> StorageResult<()> {
        check_len(value)?;
        self.take_failure()?;
        lock(&self.values).insert(key, value.to_vec());
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn delete(&self, key: u32) -> StorageResult<()> {
        self.take_failure()?;
        lock(&self.values).remove(&key);
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Storage persisted as a JSON file.
///
/// The whole map is held in memory and the file is rewritten on every
/// change, first to a sibling temp file which is then renamed over the
/// original, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<u32, Vec<u8>>>,
}

impl FileStorage {
    /// Open the storage file at `path`, creating parent directories.
    ///
    /// A missing file starts out empty; it is created on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let values = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        info!("Opened settings storage at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<u32, Vec<u8>>) -> StorageResult<()> {
        let content = serde_json::to_string(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} keys to {}", values.len(), self.path.display());
        Ok(())
    }
}

impl PersistentStorage for FileStorage {
    fn stored_len(&self, key: u32) -> Option<usize> {
        lock(&self.values).get(&key).map(Vec::len)
    }

    fn read_bytes(&self, key: u32, buf: &mut [u8]) -> Option<usize> {
        copy_out(&lock(&self.values), key, buf)
    }

    fn write_bytes(&self, key: u32, value: &[u8]) -> StorageResult<()> {
        check_len(value)?;
        let mut values = lock(&self.values);
        let mut updated = values.clone();
        updated.insert(key, value.to_vec());
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }

    fn delete(&self, key: u32) -> StorageResult<()> {
        let mut values = lock(&self.values);
        if !values.contains_key(&key) {
            return Ok(());
        }
        let mut updated = values.clone();
        updated.remove(&key);
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }
}

/// Default location of the settings file.
pub fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quickhue")
        .join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.stored_len(2), None);

        storage.write_bytes(2, b"192.168.1.2").unwrap();
        assert_eq!(storage.stored_len(2), Some(11));

        let mut buf = [0u8; 16];
        assert_eq!(storage.read_bytes(2, &mut buf), Some(11));
        assert_eq!(&buf[..11], b"192.168.1.2");

        // Short buffers get a prefix
        let mut short = [0u8; 3];
        assert_eq!(storage.read_bytes(2, &mut short), Some(3));
        assert_eq!(&short, b"192");
    }

    #[test]
    fn test_memory_storage_rejects_oversized_values() {
        let storage = MemoryStorage::new();
        let err = storage.write_bytes(3, &[b'x'; MAX_VALUE_LEN + 1]).unwrap_err();
        assert!(matches!(err, StorageError::ValueTooLarge { .. }));
        assert_eq!(storage.stored_len(3), None);
    }

    #[test]
    fn test_memory_storage_injected_failures() {
        let storage = MemoryStorage::new();
        storage.set_write_failures(2);
        assert!(storage.write_bytes(2, b"a").is_err());
        assert!(storage.delete(2).is_err());
        assert!(storage.write_bytes(2, b"a").is_ok());
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_i32_helpers() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read_i32(4).unwrap(), None);

        storage.write_i32(4, -1).unwrap();
        assert_eq!(storage.read_i32(4).unwrap(), Some(-1));
        assert_eq!(storage.get_raw(4).unwrap(), vec![0xFF; 4]);

        storage.write_bytes(4, &[1, 2]).unwrap();
        assert!(matches!(
            storage.read_i32(4),
            Err(StorageError::LengthMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_delete_missing_key_is_ok() {
        let storage = MemoryStorage::new();
        assert!(storage.delete(9).is_ok());
    }

    #[test]
    fn test_file_storage_persists_across_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.write_bytes(2, b"10.0.0.2").unwrap();
            storage.write_i32(4, 7).unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.stored_len(2), Some(8));
        assert_eq!(storage.read_i32(4).unwrap(), Some(7));

        storage.delete(2).unwrap();
        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.stored_len(2), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileStorage::open(&path),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_default_storage_path() {
        let path = default_storage_path();
        assert!(path.ends_with("quickhue/settings.json"));
    }
}

//! Atomic JSON file operations.
//!
//! Each document lives in its own file. Writes go to a sibling temporary
//! file, are fsynced, then renamed over the target, so a reader never sees a
//! half-written document.

use serde::{Serialize, de::DeserializeOwned};
use stellar_core::error::{Result, StellarError};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to a JSON document on disk.
///
/// Provides:
/// - **Atomicity**: tmp file + rename
/// - **Isolation**: `update` holds an exclusive lock file for read-modify-write
/// - **Durability**: explicit fsync before rename
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the document.
    ///
    /// Returns `Ok(None)` if the file does not exist or is empty.
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Writes `data` atomically.
    pub fn save(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Creates the document, failing if it already exists.
    pub fn create(&self, data: &T) -> Result<()> {
        let _lock = FileLock::acquire(&self.path)?;
        if self.path.exists() {
            return Err(StellarError::persistence(format!(
                "document already exists: {}",
                self.path.display()
            )));
        }
        self.save(data)
    }

    /// Read-modify-write under an exclusive lock.
    ///
    /// `f` sees the current document; nothing is written if it returns `Err`.
    /// Returns `NotFound` if the document does not exist.
    pub fn update<R, F>(&self, entity_type: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self
            .load()?
            .ok_or_else(|| StellarError::not_found(entity_type, self.path.display().to_string()))?;
        let result = f(&mut data)?;
        self.save(&data)?;

        Ok(result)
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| StellarError::io("path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| StellarError::io("path has no file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock on `<path>.lock`, released when the handle is dropped.
///
/// The lock file itself is left in place. Unlinking it would let a waiter
/// that already opened the old inode and a newcomer that creates a fresh one
/// both hold "the" lock at once.
struct FileLock {
    #[allow(dead_code)]
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| StellarError::persistence(format!("failed to acquire lock: {e}")))?;
        }

        Ok(FileLock { file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        count: u32,
    }

    fn counter() -> Counter {
        Counter {
            name: "test".to_string(),
            count: 42,
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("c.json"));

        file.save(&counter()).unwrap();

        assert_eq!(file.load().unwrap(), Some(counter()));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("missing.json"));

        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("c.json"));

        file.create(&counter()).unwrap();
        let err = file.create(&counter()).unwrap_err();

        assert!(err.is_persistence());
    }

    #[test]
    fn test_update() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("c.json"));
        file.save(&counter()).unwrap();

        let count = file
            .update("counter", |c| {
                c.count += 8;
                Ok(c.count)
            })
            .unwrap();

        assert_eq!(count, 50);
        assert_eq!(file.load().unwrap().unwrap().count, 50);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("c.json"));
        file.save(&counter()).unwrap();

        let result: Result<()> = file.update("counter", |c| {
            c.count = 0;
            Err(StellarError::internal("abort"))
        });

        assert!(result.is_err());
        assert_eq!(file.load().unwrap().unwrap().count, 42);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("missing.json"));

        let err = file.update("counter", |_| Ok(())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_no_leftover_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("c.json");
        let file = AtomicJsonFile::<Counter>::new(path.clone());

        file.save(&counter()).unwrap();
        file.update("counter", |c| {
            c.count += 1;
            Ok(())
        })
        .unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".c.json.tmp").exists());
        // The lock file stays so every locker shares one inode.
        assert!(temp_dir.path().join("c.lock").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("c.json");
        AtomicJsonFile::<Counter>::new(path.clone())
            .save(&Counter {
                name: "shared".to_string(),
                count: 0,
            })
            .unwrap();

        let workers: Vec<_> = (0..3)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let file = AtomicJsonFile::<Counter>::new(path);
                    for _ in 0..20 {
                        file.update("counter", |c| {
                            c.count += 1;
                            Ok(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let file = AtomicJsonFile::<Counter>::new(path);
        assert_eq!(file.load().unwrap().unwrap().count, 60);
    }
}

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use fieldnode_core::storage::{LogMedium, StorageError};
use log::warn;

/// A host directory standing in for the SD card.
///
/// Removing the directory while the simulator runs behaves like pulling the
/// card: ticks fail until it is created again.
pub struct FsMedium {
    root: PathBuf,
}

impl FsMedium {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let name = path.trim_start_matches('/');
        if name.is_empty() || name.contains("..") {
            return Err(StorageError::InvalidName);
        }
        Ok(self.root.join(name))
    }
}

impl LogMedium for FsMedium {
    fn reinitialize(&mut self) -> Result<(), StorageError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            warn!("Medium {} not present", self.root.display());
            Err(StorageError::Unavailable)
        }
    }

    fn exists(&mut self, path: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.exists())
    }

    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                warn!("Open {} failed: {}", path.display(), e);
                StorageError::OpenFailed
            })?;
        file.write_all(data).map_err(|e| {
            warn!("Write {} failed: {}", path.display(), e);
            StorageError::WriteFailed
        })?;
        file.flush().map_err(|_| StorageError::WriteFailed)?;
        file.sync_all().map_err(|_| StorageError::CloseFailed)
    }

    fn release(&mut self) {}
}

//! Durable sample log
//!
//! Records are appended as comma separated text lines to one file on a
//! removable medium. The medium is brought up from scratch before every
//! access cycle and released afterwards, so a card that was pulled and
//! reinserted between ticks is picked up again without a reboot.

pub mod log_file;
pub mod logger;
pub mod record;
pub mod sd_card;

pub use log_file::*;
pub use logger::*;
pub use record::*;

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage medium not available")]
    Unavailable,
    #[error("failed to open log file")]
    OpenFailed,
    #[error("failed to write log file")]
    WriteFailed,
    #[error("failed to close log file")]
    CloseFailed,
    #[error("log file name not representable on the medium")]
    InvalidName,
    #[error("every log file name is taken")]
    NamesExhausted,
}

/// A removable medium holding append-only text files.
///
/// Accesses are blocking. An access cycle is `reinitialize`, any number of
/// `exists`/`append` calls, then `release`.
pub trait LogMedium {
    /// Bring the medium up from scratch.
    fn reinitialize(&mut self) -> Result<(), StorageError>;

    fn exists(&mut self, path: &str) -> Result<bool, StorageError>;

    /// Open `path` for append at end of file, creating it if missing, write
    /// all of `data`, flush and close.
    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Release the medium until the next cycle.
    fn release(&mut self);
}

impl<M: LogMedium> LogMedium for &mut M {
    fn reinitialize(&mut self) -> Result<(), StorageError> {
        (**self).reinitialize()
    }

    fn exists(&mut self, path: &str) -> Result<bool, StorageError> {
        (**self).exists(path)
    }

    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).append(path, data)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

use alloc::format;
use alloc::string::String;

use log::info;

use super::{LogMedium, StorageError};
use crate::config::LogFilePolicy;

/// Largest index probed by [`LogFilePolicy::NextAvailable`]. Keeps
/// `Data<N>` inside an 8.3 base name.
pub const MAX_FILE_INDEX: u32 = 9999;

/// The file this boot appends to.
///
/// Under the next-available policy the name is probed once, on the first
/// access cycle that succeeds, and kept for the rest of the boot.
#[derive(Debug, Clone)]
pub struct LogFile {
    policy: LogFilePolicy,
    path: Option<String>,
}

impl LogFile {
    pub fn new(policy: LogFilePolicy) -> Self {
        let path = match &policy {
            LogFilePolicy::Fixed { path } => Some(path.clone()),
            LogFilePolicy::NextAvailable { .. } => None,
        };
        Self { policy, path }
    }

    /// Path chosen so far, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Return the log path, probing the medium for it if not chosen yet.
    ///
    /// Must be called inside an access cycle.
    pub fn resolve<M: LogMedium>(&mut self, medium: &mut M) -> Result<&str, StorageError> {
        if self.path.is_none() {
            let LogFilePolicy::NextAvailable { prefix, extension } = &self.policy else {
                return Err(StorageError::InvalidName);
            };
            let path = next_available(medium, prefix, extension)?;
            info!("Logging to {}", path);
            self.path = Some(path);
        }
        self.path.as_deref().ok_or(StorageError::InvalidName)
    }
}

/// `<prefix><N><extension>` for the smallest `N >= 1` not on the medium.
pub fn next_available<M: LogMedium>(
    medium: &mut M,
    prefix: &str,
    extension: &str,
) -> Result<String, StorageError> {
    for index in 1..=MAX_FILE_INDEX {
        let candidate = format!("{prefix}{index}{extension}");
        if !medium.exists(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(StorageError::NamesExhausted)
}

use alloc::string::String;

use log::{debug, error, info, warn};

use super::{HEADER, LogFile, LogMedium, LogRecord, StorageError};
use crate::config::LogFilePolicy;

/// Result of one logging tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    /// The record landed in the log. `created` is set when this write also
    /// created the file and its header.
    Written { bytes: usize, created: bool },
    /// The tick was abandoned. Nothing was written.
    Failed(StorageError),
}

/// Appends one record per logging tick to the log file.
///
/// Every tick runs a full access cycle on the medium. Failed ticks are not
/// buffered; the next tick starts over with a fresh cycle.
pub struct SampleLogger<M> {
    medium: M,
    file: LogFile,
    line: String,
}

impl<M: LogMedium> SampleLogger<M> {
    pub fn new(medium: M, policy: LogFilePolicy) -> Self {
        Self {
            medium,
            file: LogFile::new(policy),
            line: String::new(),
        }
    }

    /// Pick the log file name up front. A failure here is not fatal; the
    /// name is probed again on the first tick that reaches the medium.
    pub fn startup(&mut self) {
        let result = self
            .medium
            .reinitialize()
            .and_then(|()| self.file.resolve(&mut self.medium).map(|_| ()));
        self.medium.release();
        match (result, self.file.path()) {
            (Ok(()), Some(path)) => info!("Logging to {}", path),
            (Ok(()), None) => {}
            (Err(e), _) => warn!("Log file not chosen at startup: {}", e),
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.file.path()
    }

    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    pub fn log(&mut self, record: &LogRecord) -> LogOutcome {
        self.line.clear();
        if record.write_line(&mut self.line).is_err() {
            return LogOutcome::Failed(StorageError::WriteFailed);
        }

        let result = self.write_cycle();
        self.medium.release();

        match result {
            Ok(created) => {
                debug!("Logged: {}", self.line.trim_end());
                LogOutcome::Written {
                    bytes: self.line.len(),
                    created,
                }
            }
            Err(e) => {
                error!("Sample not logged: {}", e);
                LogOutcome::Failed(e)
            }
        }
    }

    /// Returns whether the file was created by this write.
    fn write_cycle(&mut self) -> Result<bool, StorageError> {
        self.medium.reinitialize()?;
        let path = self.file.resolve(&mut self.medium)?;

        if self.medium.exists(path)? {
            self.medium.append(path, self.line.as_bytes())?;
            return Ok(false);
        }

        // Header and first record go out in one write so a new file never
        // holds a header without its record.
        let mut first = String::with_capacity(HEADER.len() + 1 + self.line.len());
        first.push_str(HEADER);
        first.push('\n');
        first.push_str(&self.line);
        self.medium.append(path, first.as_bytes())?;
        Ok(true)
    }
}

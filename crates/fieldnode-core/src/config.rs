use alloc::string::String;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Wireless credentials, borrowed from wherever the platform keeps them.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// How the node picks the file it appends samples to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum LogFilePolicy {
    /// `<prefix><N><extension>` with the smallest `N >= 1` not yet on the medium.
    NextAvailable { prefix: String, extension: String },
    /// One file appended to across power cycles.
    Fixed { path: String },
}

impl Default for LogFilePolicy {
    fn default() -> Self {
        Self::NextAvailable {
            prefix: String::from("/Data"),
            extension: String::from(".txt"),
        }
    }
}

/// Runtime tunables of the node.
///
/// Every field has a default matching the deployed unit, so a partial
/// configuration file only needs to name what it changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Status snapshot cadence.
    pub display_interval_ms: u64,
    /// Sample logging cadence.
    pub log_interval_ms: u64,
    /// Remote sync cadence.
    pub sync_interval_ms: u64,
    /// Minimum spacing of two accepted button edges. Zero disables debouncing.
    pub debounce_ms: u64,
    /// Upper bound on a single remote store read or write.
    pub remote_timeout_ms: u32,
    /// Upper bound on one geolocation request, scan included.
    pub geolocation_timeout_ms: u32,
    /// Offset applied to receiver (UTC) time before rendering it.
    pub utc_offset_hours: i8,
    /// Calibration offset added to every temperature reading, in °F.
    pub temperature_offset_f: f32,
    pub log_file: LogFilePolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            display_interval_ms: 1_000,
            log_interval_ms: 25_000,
            sync_interval_ms: 25_000,
            debounce_ms: 50,
            remote_timeout_ms: 5_000,
            geolocation_timeout_ms: 10_000,
            utc_offset_hours: -5,
            temperature_offset_f: -4.0,
            log_file: LogFilePolicy::default(),
        }
    }
}

impl NodeConfig {
    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

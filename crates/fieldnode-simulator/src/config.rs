//! Simulator configuration, read from a TOML file.
//!
//! Every table is optional; missing values fall back to the defaults below
//! and the node's own defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use fieldnode_core::config::NodeConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    /// Directory standing in for the SD card.
    pub output_dir: PathBuf,
    /// Stop after this many seconds. Zero runs until interrupted.
    pub run_for_secs: u64,
    pub node: NodeConfig,
    pub link: LinkConfig,
    pub buttons: ButtonConfig,
    pub position: PositionConfig,
    pub remote: RemoteConfig,
}

/// The link alternates between up and down periods.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkConfig {
    pub online_secs: u64,
    pub offline_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ButtonConfig {
    /// Average spacing of presses.
    pub mean_interval_ms: u64,
    /// Share of presses on the decrement button, in percent.
    pub decrement_percent: u8,
    /// Spacing of the contact bounce that follows each press.
    pub bounce_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PositionConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds of invalid sentences before the receiver reports a fix.
    pub acquisition_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    /// Another client overwrites the remote counter this often. Zero disables it.
    pub foreign_edit_secs: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("sim-sd"),
            run_for_secs: 0,
            node: NodeConfig::default(),
            link: LinkConfig::default(),
            buttons: ButtonConfig::default(),
            position: PositionConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            online_secs: 90,
            offline_secs: 40,
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            mean_interval_ms: 4_000,
            decrement_percent: 30,
            bounce_ms: 5,
        }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            latitude: 40.7128,
            longitude: -74.006,
            acquisition_secs: 30,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            foreign_edit_secs: 120,
        }
    }
}

impl SimConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

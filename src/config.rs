//! TOML-based configuration for the tracker.

use crate::registry::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory for monthly report files.
pub const DEFAULT_OUTPUT_DIR: &str = "./device_logs";

/// Default seconds between background flushes.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 300;

/// Configuration for a device tracker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Directory the monthly report files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Seconds between background flushes; zero is treated as one
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
    /// Record TCP connection events
    #[serde(default = "default_true")]
    pub track_tcp: bool,
    /// Record UDP session events
    #[serde(default = "default_true")]
    pub track_udp: bool,
    /// Record traffic deltas
    #[serde(default = "default_true")]
    pub track_traffic: bool,
    /// Upper bound on tracked endpoints; absent or zero means unbounded
    #[serde(default)]
    pub max_devices: Option<usize>,
}

fn default_true() -> bool { true }
fn default_output_dir() -> PathBuf { PathBuf::from(DEFAULT_OUTPUT_DIR) }
fn default_flush_interval() -> u64 { DEFAULT_FLUSH_INTERVAL_SECS }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            track_tcp: true,
            track_udp: true,
            track_traffic: true,
            max_devices: None,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Get the flush interval as a duration. Zero is clamped to one second.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    /// Get the retention policy implied by `max_devices`.
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_limit(self.max_devices)
    }
}

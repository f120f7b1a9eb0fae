//! Runtime configuration
//!
//! Every field has a default, so an empty YAML document is a valid config.
//!
//! ```yaml
//! source:
//!   kind: stream
//!   path: F1Manager_Telemetry
//!   max_frame_len: 1048576
//! archive:
//!   save_path: C:/Users/me/AppData/Local/F1Manager24/Saved/SaveGames/autosave.sav
//!   recheck_interval_ms: 5000
//! history:
//!   max_laps: 100
//! export:
//!   enabled: true
//!   tracked_competitors: [Ferrari1, McLaren2]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{Result, TelemetryError};

/// Default channel name used by the producer for both transports.
pub const DEFAULT_CHANNEL: &str = "F1Manager_Telemetry";
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;
pub const DEFAULT_RECHECK_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_MAX_LAPS: usize = 100;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitlaneConfig {
    pub source: SourceConfig,
    pub archive: ArchiveConfig,
    pub history: HistoryConfig,
    pub export: ExportConfig,
    pub shutdown_timeout_ms: u64,
}

impl Default for PitlaneConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            archive: ArchiveConfig::default(),
            history: HistoryConfig::default(),
            export: ExportConfig::default(),
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Length-prefixed JSON frames in a shared file
    Stream {
        #[serde(default = "default_channel_path")]
        path: PathBuf,
        #[serde(default = "default_max_frame_len")]
        max_frame_len: usize,
    },
    /// Packed raw record in a file-backed region
    Region {
        #[serde(default = "default_channel_path")]
        path: PathBuf,
    },
    /// Packed raw record in a named shared-memory mapping (Windows)
    NamedRegion {
        #[serde(default = "default_channel_name")]
        name: String,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Stream { path: default_channel_path(), max_frame_len: DEFAULT_MAX_FRAME_LEN }
    }
}

fn default_channel_path() -> PathBuf {
    PathBuf::from(DEFAULT_CHANNEL)
}

fn default_channel_name() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Save file to unpack; `None` disables reference data
    pub save_path: Option<PathBuf>,
    /// Directory receiving the extracted segments; defaults to `Unpacked` next to the save
    pub output_dir: Option<PathBuf>,
    pub recheck_interval_ms: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { save_path: default_save_path(), output_dir: None, recheck_interval_ms: DEFAULT_RECHECK_INTERVAL_MS }
    }
}

impl ArchiveConfig {
    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.recheck_interval_ms)
    }

    pub fn resolved_output_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.output_dir {
            return Some(dir.clone());
        }
        let save = self.save_path.as_ref()?;
        let parent = save.parent().unwrap_or_else(|| Path::new("."));
        Some(parent.join("Unpacked"))
    }
}

fn default_save_path() -> Option<PathBuf> {
    std::env::var_os("LOCALAPPDATA")
        .map(|root| PathBuf::from(root).join("F1Manager24").join("Saved").join("SaveGames").join("autosave.sav"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_laps: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_laps: DEFAULT_MAX_LAPS }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub tracked_competitors: Vec<String>,
}

impl ExportConfig {
    pub fn is_tracked(&self, competitor: &str) -> bool {
        self.enabled && self.tracked_competitors.iter().any(|name| name == competitor)
    }
}

impl PitlaneConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| TelemetryError::config(format!("Invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        debug!(path = %path.display(), "Loading configuration");
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if let SourceConfig::Stream { max_frame_len: 0, .. } = self.source {
            return Err(TelemetryError::config("source.max_frame_len must be greater than zero"));
        }
        if let SourceConfig::NamedRegion { name } = &self.source
            && name.is_empty()
        {
            return Err(TelemetryError::config("source.name must not be empty"));
        }
        if self.history.max_laps == 0 {
            return Err(TelemetryError::config("history.max_laps must be greater than zero"));
        }
        if self.archive.recheck_interval_ms == 0 {
            return Err(TelemetryError::config("archive.recheck_interval_ms must be greater than zero"));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

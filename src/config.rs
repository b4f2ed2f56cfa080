//! Gateway configuration
//!
//! Persisted at `<config_dir>/repogate/config.json`; a missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GatewayError, Result};

const CONFIG_FILE: &str = "config.json";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "REPOGATE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Socket address the HTTP server binds to
    pub bind: String,

    /// Directory that receives cloned repositories
    pub workspace_root: PathBuf,

    /// How long terminal tasks stay pollable
    pub task_retention_secs: u64,

    /// Period of the background retention sweep
    pub sweep_interval_secs: u64,

    /// Header every mutating request must carry
    pub protocol_header: String,

    pub supported_versions: Vec<String>,

    /// Where linked projects are persisted, if anywhere
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_file: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("repogate");

        Self {
            bind: "127.0.0.1:8080".to_string(),
            workspace_root: data_dir.join("repos"),
            task_retention_secs: 300,
            sweep_interval_secs: 30,
            protocol_header: "Gateway-Version".to_string(),
            supported_versions: vec!["1".to_string()],
            projects_file: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a config directory
    pub fn load(config_dir: &Path) -> Result<Self> {
        Self::load_file(&config_dir.join(CONFIG_FILE))
    }

    /// Load configuration from an explicit file path
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::OperationFailed(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            GatewayError::OperationFailed(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Resolve the config file from the environment or the user config dir
    pub fn discover() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_file(Path::new(&path));
        }

        match dirs::config_dir() {
            Some(dir) => Self::load(&dir.join("repogate")),
            None => Ok(Self::default()),
        }
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderContext {
    pub direction: Direction,
    pub initial_usages_position: String,
    pub root_node_name: String,
}

impl BuilderContext {
    pub fn is_backward(&self) -> bool {
        self.direction == Direction::Backward
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    pub debounce_ms: u64,
    pub direction: Direction,
    pub initial_text: String,
    pub canceled_text: String,
    pub root_node_name: String,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            direction: Direction::Forward,
            initial_text: "Select where to search for dependencies".to_string(),
            canceled_text: "Usage search was canceled".to_string(),
            root_node_name: "Usages".to_string(),
        }
    }
}

impl PanelSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn builder_context(&self) -> BuilderContext {
        BuilderContext {
            direction: self.direction,
            initial_usages_position: self.initial_text.clone(),
            root_node_name: self.root_node_name.clone(),
        }
    }
}

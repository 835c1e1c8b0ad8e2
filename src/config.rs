//! Configuration loading and management
//!
//! Handles parsing of `cotask.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Configuration file name inside the data directory's parent
pub const CONFIG_FILENAME: &str = "cotask.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Tasks configuration
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Demo workload configuration
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            tasks: TasksConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the snapshot files, relative to the working root
    #[serde(default = "default_data_dir")]
    pub dir: String,
}

fn default_data_dir() -> String {
    ".cotask".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Category applied when a task is created without one
    #[serde(default = "default_category")]
    pub default_category: String,
}

fn default_category() -> String {
    crate::task::DEFAULT_CATEGORY.to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_category: default_category(),
        }
    }
}

/// Demo workload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of concurrent sessions the demo spawns
    #[serde(default = "default_demo_sessions")]
    pub sessions: usize,

    /// Tasks each demo session creates
    #[serde(default = "default_demo_tasks_per_session")]
    pub tasks_per_session: usize,
}

fn default_demo_sessions() -> usize {
    3
}

fn default_demo_tasks_per_session() -> usize {
    2
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sessions: default_demo_sessions(),
            tasks_per_session: default_demo_tasks_per_session(),
        }
    }
}

impl Config {
    /// Load configuration from a `cotask.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a working root, or return defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILENAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Snapshot file paths under the configured data directory
    pub fn tasks_file(&self, root: &Path) -> PathBuf {
        root.join(&self.data.dir).join("tasks.json")
    }

    pub fn users_file(&self, root: &Path) -> PathBuf {
        root.join(&self.data.dir).join("users.json")
    }

    fn validate(&self) -> Result<()> {
        if self.data.dir.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "data.dir cannot be empty".to_string(),
            ));
        }
        if self.tasks.default_category.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "tasks.default_category cannot be empty".to_string(),
            ));
        }
        if self.demo.sessions == 0 {
            return Err(Error::InvalidConfig(
                "demo.sessions must be > 0".to_string(),
            ));
        }
        if self.demo.tasks_per_session == 0 {
            return Err(Error::InvalidConfig(
                "demo.tasks_per_session must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

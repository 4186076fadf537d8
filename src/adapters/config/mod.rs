use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::datasources::test_plugin;
use crate::error::{PluginError, PluginResult};

/// Settings pushed to an instance some time after it starts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScheduledChange {
    pub after_secs: f64,
    #[serde(default)]
    pub settings: toml::Table,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatasourceConfig {
    pub type_name: String,
    #[serde(default)]
    pub settings: toml::Table,
    #[serde(default)]
    pub changes: Vec<ScheduledChange>,
}

impl DatasourceConfig {
    pub fn settings_json(&self) -> PluginResult<Value> {
        table_to_json(&self.type_name, &self.settings)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Stop after this many seconds; run until Ctrl-C when unset.
    pub run_for_secs: Option<u64>,
    pub datasources: Vec<DatasourceConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            run_for_secs: None,
            datasources: vec![DatasourceConfig {
                type_name: test_plugin::TYPE_NAME.to_string(),
                settings: toml::Table::new(),
                changes: Vec::new(),
            }],
        }
    }
}

impl RunnerConfig {
    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dinoboard")
            .join("config.toml")
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// An explicit path must exist. A missing default file means the default
    /// configuration.
    pub fn load(path: Option<&Path>) -> PluginResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> PluginResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PluginError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| PluginError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_secs.map(Duration::from_secs)
    }
}

impl ScheduledChange {
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.after_secs).unwrap_or(Duration::ZERO)
    }

    pub fn settings_json(&self, type_name: &str) -> PluginResult<Value> {
        table_to_json(type_name, &self.settings)
    }
}

fn table_to_json(type_name: &str, table: &toml::Table) -> PluginResult<Value> {
    serde_json::to_value(table).map_err(|source| PluginError::Settings {
        type_name: type_name.to_string(),
        source,
    })
}

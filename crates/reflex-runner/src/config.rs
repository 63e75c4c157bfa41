use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("IO error reading config: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflexConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Wall-clock length of one step when running in real time
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Upper bound on steps for a single run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Path depth used when listing binding candidates
    #[serde(default = "default_candidate_depth")]
    pub candidate_depth: usize,
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_max_steps() -> u32 {
    600
}

fn default_candidate_depth() -> usize {
    3
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_steps: default_max_steps(),
            candidate_depth: default_candidate_depth(),
        }
    }
}

impl RuntimeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `<data dir>/logs/<component>.log`
    #[serde(default)]
    pub file: bool,

    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default)]
    pub filter: Option<String>,
}

impl ReflexConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "reflex")
    }

    /// `<config dir>/reflex/config.toml`, when a home directory exists
    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Load the default config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self, ConfigLoadError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::Io(e.to_string()))?;
        let config =
            toml::from_str(&content).map_err(|e| ConfigLoadError::Parse(e.to_string()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self)?;
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[runtime]\nmax_steps = 12\n").unwrap();

        let config = ReflexConfig::load_from(&path).unwrap();
        assert_eq!(config.runtime.max_steps, 12);
        assert_eq!(config.runtime.tick_interval_ms, 50);
        assert_eq!(config.runtime.candidate_depth, 3);
        assert!(!config.logging.file);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ReflexConfig::default();
        config.logging.filter = Some("handler=debug".to_string());
        config.runtime.tick_interval_ms = 20;

        config.save_to(&path).unwrap();
        let loaded = ReflexConfig::load_from(&path).unwrap();
        assert_eq!(loaded.logging.filter.as_deref(), Some("handler=debug"));
        assert_eq!(loaded.runtime.tick_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            ReflexConfig::load_from(&missing),
            Err(ConfigLoadError::NotFound(_))
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[runtime\n").unwrap();
        assert!(matches!(
            ReflexConfig::load_from(&broken),
            Err(ConfigLoadError::Parse(_))
        ));
    }
}

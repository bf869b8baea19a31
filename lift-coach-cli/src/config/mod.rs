use anyhow::{Context, Result};
use lift_coach_core::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

/// Analysis service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Bundled demo clips, one frame directory per lift
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_frames_root")]
    pub frames_root: PathBuf,

    #[serde(default = "default_fps")]
    pub fps: f32,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_frames_root() -> PathBuf {
    Config::config_dir()
        .map(|dir| dir.join("demo-videos"))
        .unwrap_or_else(|_| PathBuf::from("demo-videos"))
}

fn default_fps() -> f32 {
    30.0
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames_root: default_frames_root(),
            fps: default_fps(),
        }
    }
}

impl DemoConfig {
    /// Recorded pose track shipped next to a demo clip
    pub fn pose_track(&self, slug: &str) -> PathBuf {
        self.frames_root.join(format!("{}.poses.json", slug))
    }
}

impl Config {
    /// Get config directory path (~/.lift-coach/)
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".lift-coach"))
    }

    /// Get config file path (~/.lift-coach/config.toml)
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Resolve the config path, preferring an explicit override
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::config_file(),
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_file = Self::resolve_path(path)?;

        if !config_file.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default().with_env_overrides());
        }

        let contents = fs::read_to_string(&config_file)
            .with_context(|| format!("Failed to read config file {}", config_file.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        self.pipeline = self.pipeline.with_env_overrides();
        self
    }

    /// Save configuration to file
    pub fn save_to(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_file = Self::resolve_path(path)?;
        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_file, contents).context("Failed to write config file")?;

        Ok(config_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3001");
        assert_eq!(config.api.timeout_seconds, 60);
        assert_eq!(config.pipeline.sampling_interval, 6);
        assert_eq!(config.demo.fps, 30.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.api.base_url, deserialized.api.base_url);
        assert_eq!(config.pipeline, deserialized.pipeline);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "http://coach.internal:8080"

            [pipeline]
            sampling_interval = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://coach.internal:8080");
        assert_eq!(config.api.timeout_seconds, 60);
        assert_eq!(config.pipeline.sampling_interval, 3);
        assert_eq!(config.pipeline.smoothing_alpha, 0.7);
    }

    #[test]
    fn test_save_and_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.timeout_seconds = 5;
        config.demo.frames_root = PathBuf::from("/srv/demo");
        let written = config.save_to(Some(&path)).unwrap();
        assert_eq!(written, path);

        let loaded = Config::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.api.timeout_seconds, 5);
        assert_eq!(loaded.demo.frames_root, PathBuf::from("/srv/demo"));
        assert_eq!(
            loaded.demo.pose_track("squat"),
            PathBuf::from("/srv/demo/squat.poses.json")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:3001");
    }
}

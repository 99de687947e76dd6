use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::AudioConfig;
use crate::field::{FieldConfig, FieldTuning};
use crate::params::PulseConfig;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "pulsefield.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub pulse: PulseConfig,
    #[serde(default)]
    pub tuning: FieldTuning,
}

impl AppConfig {
    /// Load from `path`, or from `pulsefield.toml` if present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(&fallback)?
                } else {
                    tracing::debug!("no config file, using defaults");
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Parsing config {}", path.display()))?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.tuning.validate()?;
        if self.field.fps == 0 {
            anyhow::bail!("field.fps must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.field.particle_count, 800);
        assert_eq!(config.field.fps, 60);
        assert!(config.audio.input_device.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::parse(
            r#"
            [audio]
            input_device = "USB Mic"

            [field]
            seed = 42

            [pulse]
            speed = 2.5

            [tuning]
            damping = 0.85
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.input_device.as_deref(), Some("USB Mic"));
        assert_eq!(config.field.seed, Some(42));
        assert_eq!(config.field.particle_count, 800);
        assert_eq!(config.pulse.speed, 2.5);
        assert_eq!(config.pulse.strength, 1.0);
        assert_eq!(config.tuning.damping, 0.85);
        assert_eq!(config.tuning.input_gain, 10.0);
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let config = AppConfig::parse("[tuning]\ndamping = 1.5\n").unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::parse("[field]\nfps = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(AppConfig::parse("[field\nparticle_count = ").is_err());
        assert!(AppConfig::parse("[field]\nparticle_count = \"many\"\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let err = AppConfig::load(Some(Path::new("definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Reading config"));
    }
}

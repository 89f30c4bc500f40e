//! Persisted default settings.
//!
//! A single JSON document holding a [`PipelineConfig`]. Missing keys take
//! their defaults and out-of-range values are clamped on load. Loading at
//! plugin construction is non-fatal: any problem is logged and defaults win.

use crate::error::PhonoResult;
use crate::pipeline::PipelineConfig;
use std::path::{Path, PathBuf};

/// Overrides the settings location when set.
pub const CONFIG_ENV_VAR: &str = "PHONOSTAGE_CONFIG";

impl PipelineConfig {
    /// `$PHONOSTAGE_CONFIG`, else `$HOME/.config/phonostage/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(p) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(p));
        }
        std::env::var_os("HOME").filter(|h| !h.is_empty()).map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("phonostage")
                .join("settings.json")
        })
    }

    pub fn load(path: &Path) -> PhonoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        Ok(config.clamped())
    }

    pub fn save(&self, path: &Path) -> PhonoResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(&self.clamped())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded settings from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::SubsonicMode;
    use crate::error::PhonoError;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("phonostage-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("nested/dir/settings.json");
        let config = PipelineConfig {
            gain_db: -3.5,
            subsonic: SubsonicMode::SecondOrder,
            declick_enable: true,
            notch_enable: true,
            notch_freq: 60.0,
            ..PipelineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let path = scratch("partial.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "gain_db": 100.0, "subsonic": "first_order" }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.gain_db, 40.0);
        assert_eq!(config.subsonic, SubsonicMode::FirstOrder);
        assert!(config.riaa_enable);
        assert_eq!(config.notch_q, 10.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_and_missing_files() {
        let path = scratch("broken.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(PhonoError::SettingsFormat(_))
        ));
        assert!(matches!(
            PipelineConfig::load(&scratch("absent.json")),
            Err(PhonoError::SettingsIo(_))
        ));
        let _ = std::fs::remove_file(&path);
    }
}

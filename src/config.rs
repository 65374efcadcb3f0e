use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::types::EngineConfig;
use crate::util::atomic_write_str;

/// Get the canonical config file path (~/.dayplan/config.json)
pub fn config_path() -> Result<PathBuf, EngineError> {
    let home = dirs::home_dir().ok_or_else(|| {
        EngineError::ConfigurationError("Could not find home directory".to_string())
    })?;
    Ok(home.join(".dayplan").join("config.json"))
}

/// Load config from ~/.dayplan/config.json.
///
/// A missing file (or missing home directory) yields the defaults; a file
/// that exists but does not parse is an error.
pub fn load_config() -> Result<EngineConfig, EngineError> {
    match config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            log::warn!("{}; using default engine config", e);
            Ok(EngineConfig::default())
        }
    }
}

pub fn load_config_from(path: &Path) -> Result<EngineConfig, EngineError> {
    if !path.exists() {
        log::debug!("No config at {}; using defaults", path.display());
        return Ok(EngineConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: EngineConfig = serde_json::from_str(&content).map_err(|e| {
        EngineError::ConfigurationError(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    if config.split_threshold_days < 1 {
        return Err(EngineError::ConfigurationError(format!(
            "splitThresholdDays must be at least 1, got {}",
            config.split_threshold_days
        )));
    }

    Ok(config)
}

/// Write config atomically, creating the parent directory if needed.
pub fn save_config_to(path: &Path, config: &EngineConfig) -> Result<(), EngineError> {
    let content = serde_json::to_string_pretty(config)?;
    atomic_write_str(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = EngineConfig {
            split_threshold_days: 5,
            default_available_hours: 3.5,
            ..EngineConfig::default()
        };

        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(EngineError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_zero_split_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "splitThresholdDays": 0 }"#).unwrap();
        assert!(load_config_from(&path).is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::copy::DEFAULT_COPY_BUFFER_SIZE;
use crate::hash::HashAlgorithm;
use crate::index::DEFAULT_INDEX_FILE_NAME;
use crate::space::DEFAULT_INDEX_BYTES_PER_RECORD;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backup: BackupConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Skip files not modified since the last completed run
    pub incremental: bool,
    pub follow_symlinks: bool,
    pub hash_algorithm: HashAlgorithm,
    pub copy_buffer_size: usize,
    /// Index growth estimate per planned copy, used by the free-space check
    pub index_bytes_per_record: u64,
    /// Index file name inside the destination root, unless `--db` is given
    pub index_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub json: bool,
    pub html: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            incremental: true,
            follow_symlinks: false,
            hash_algorithm: HashAlgorithm::Sha256,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            index_bytes_per_record: DEFAULT_INDEX_BYTES_PER_RECORD,
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            json: true,
            html: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from the user config directory, creating a default file if absent
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            debug!("Config file not found, creating default");
            let config = Self::default();
            if let Err(e) = config.save_to(&config_path) {
                warn!("Could not write default config to {}: {}", config_path.display(), e);
            }
            Ok(config)
        }
    }

    /// Load and validate config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| Error::Configuration {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(config_dir.join("media-backup").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.backup.copy_buffer_size == 0 {
            return Err(Error::Configuration {
                reason: "backup.copy_buffer_size must be greater than 0".to_string(),
            });
        }

        let name = self.backup.index_file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Error::Configuration {
                reason: format!("backup.index_file_name is not a file name: {:?}", name),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return Err(Error::Configuration {
                reason: format!("logging.level is not a log level: {:?}", self.logging.level),
            });
        }

        if !self.report.json && !self.report.html {
            warn!("Both report formats are disabled; no report will be written");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.backup.incremental);
        assert_eq!(config.backup.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.backup.index_file_name, DEFAULT_INDEX_FILE_NAME);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[backup]\nhash_algorithm = \"blake3\"\nincremental = false\n")?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.backup.hash_algorithm, HashAlgorithm::Blake3);
        assert!(!config.backup.incremental);
        assert_eq!(config.backup.copy_buffer_size, DEFAULT_COPY_BUFFER_SIZE);
        assert!(config.report.html);
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.report.json = false;
        config.save_to(&path)?;

        assert_eq!(AppConfig::load_from(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.backup.copy_buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.backup.index_file_name = "../escape.index".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}

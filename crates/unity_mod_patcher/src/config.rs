//! Patcher configuration stored as TOML.

use crate::error::Result;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs;

/// Settings that shape a patch session.
///
/// # TOML format
///
/// ```toml
/// container_extensions = ["assets"]
/// resource_extensions = ["resS", "resource"]
/// replacement_prefix = "RE"
/// backup_dir_name = "Backups"
/// alignment = 4
/// ```
///
/// Every key is optional; missing keys take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatcherConfig {
    /// Extensions (without the dot) identifying container files.
    pub container_extensions: Vec<String>,
    /// Extensions identifying companion resource blobs.
    pub resource_extensions: Vec<String>,
    /// Case-insensitive prefix stripped from replacement file names.
    pub replacement_prefix: String,
    /// Name of the backup tree created next to the install root.
    pub backup_dir_name: String,
    /// Byte alignment of payloads appended to resource blobs.
    pub alignment: u64,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            container_extensions: vec!["assets".to_string()],
            resource_extensions: vec!["resS".to_string(), "resource".to_string()],
            replacement_prefix: "RE".to_string(),
            backup_dir_name: "Backups".to_string(),
            alignment: 4,
        }
    }
}

impl PatcherConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        if config.alignment == 0 {
            tracing::warn!("Config alignment of 0 is invalid, using 1");
            config.alignment = 1;
        }
        Ok(config)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn is_container(&self, path: &Utf8Path) -> bool {
        has_extension(path, &self.container_extensions)
    }

    pub fn is_resource(&self, path: &Utf8Path) -> bool {
        has_extension(path, &self.resource_extensions)
    }
}

fn has_extension(path: &Utf8Path, extensions: &[String]) -> bool {
    path.extension()
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("patcher.toml")).unwrap();
        assert_eq!(PatcherConfig::load(&path).unwrap(), PatcherConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("patcher.toml")).unwrap();
        fs::write(&path, "replacement_prefix = \"MOD\"\n").unwrap();

        let config = PatcherConfig::load(&path).unwrap();
        assert_eq!(config.replacement_prefix, "MOD");
        assert_eq!(config.alignment, 4);
        assert_eq!(config.backup_dir_name, "Backups");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("patcher.toml")).unwrap();
        fs::write(&path, "alignment = \"four\"").unwrap();
        assert!(PatcherConfig::load(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/patcher.toml")).unwrap();
        let config = PatcherConfig {
            alignment: 16,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PatcherConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_extension_matching_ignores_case() {
        let config = PatcherConfig::default();
        assert!(config.is_container(Utf8Path::new("Data/level0.ASSETS")));
        assert!(config.is_resource(Utf8Path::new("Data/level0.assets.ress")));
        assert!(!config.is_container(Utf8Path::new("Data/level0")));
    }
}

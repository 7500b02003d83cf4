use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vpn::wireguard::DEFAULT_CONFIG_DIR;

pub const APP_NAME: &str = "wgtoggle";

/// Optional colour overrides, `#RRGGBB` or `#RGB`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_bg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface the user last worked with, restored as the selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interface: Option<String>,

    /// Where tunnel configurations are discovered
    #[serde(default = "default_wireguard_dir")]
    pub wireguard_dir: PathBuf,

    /// Desktop notifications for --up / --down
    #[serde(default)]
    pub notifications: bool,

    #[serde(default)]
    pub theme: ThemeConfig,
}

fn default_wireguard_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_DIR)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_interface: None,
            wireguard_dir: default_wireguard_dir(),
            notifications: false,
            theme: ThemeConfig::default(),
        }
    }
}

/// `~/.config/wgtoggle`, created on demand
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
        .join(APP_NAME);

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("Could not create config directory: {}", e);
    }

    Ok(dir)
}

impl AppConfig {
    /// `~/.config/wgtoggle/config.toml`
    pub fn path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load config from the user config dir; never fails
    pub fn load() -> Self {
        match Self::path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => AppConfig::default(),
        }
    }

    /// Load from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return AppConfig::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Failed to parse config: {}", e),
            },
            Err(e) => tracing::warn!("Failed to read config: {}", e),
        }

        AppConfig::default()
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut clean_config = self.clone();

        // Whitespace-only names are not worth remembering
        clean_config.last_interface = clean_config
            .last_interface
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            last_interface: Some("office".to_string()),
            wireguard_dir: PathBuf::from("/etc/wireguard"),
            notifications: true,
            theme: ThemeConfig {
                accent: Some("#ffc107".to_string()),
                ..Default::default()
            },
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = toml::from_str("last_interface = \"wg0\"\n").unwrap();
        assert_eq!(config.last_interface.as_deref(), Some("wg0"));
        assert_eq!(config.wireguard_dir, PathBuf::from(DEFAULT_CONFIG_DIR));
        assert!(!config.notifications);
    }

    #[test]
    fn test_load_from_bad_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
        assert_eq!(
            AppConfig::load_from(&dir.path().join("absent.toml")),
            AppConfig::default()
        );
    }

    #[test]
    fn test_save_trims_interface_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig {
            last_interface: Some("  wg0 ".to_string()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(
            AppConfig::load_from(&path).last_interface.as_deref(),
            Some("wg0")
        );

        let blank = AppConfig {
            last_interface: Some("   ".to_string()),
            ..Default::default()
        };
        blank.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).last_interface, None);
    }
}

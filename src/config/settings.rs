//! Settings file and default scan configuration.
//!
//! Settings live in an optional JSON file (by default
//! `<XDG config dir>/portscan/settings.json`). Every field is optional;
//! anything left out falls back to the built-in defaults.

use crate::banner::default_payloads;
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{ScanConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT};
use crate::types::PortList;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Hosts scanned when none are configured.
pub const DEFAULT_HOSTS: &[&str] = &["scanme.nmap.org", "github.com"];

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portscan)
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("org", "portscan", "portscan")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Scan settings as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub hosts: Option<Vec<String>>,
    pub ports: Option<PortList>,
    pub max_concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub payloads: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from the default location, or defaults if there is no
    /// file or no configuration directory at all.
    pub fn load() -> ConfigResult<Self> {
        match Paths::discover() {
            Ok(paths) => Self::load_in(Some(&paths)),
            Err(e) => {
                debug!("{}, using defaults", e);
                Self::load_in(None)
            }
        }
    }

    fn load_in(paths: Option<&Paths>) -> ConfigResult<Self> {
        let Some(file) = paths.map(Paths::settings_file) else {
            return Ok(Self::default());
        };

        if !file.exists() {
            debug!("no settings file at {}", file.display());
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Resolve into a scan configuration, filling gaps with defaults.
    pub fn into_scan_config(self) -> ScanConfig {
        let hosts = self
            .hosts
            .unwrap_or_else(|| DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect());
        let ports = self.ports.unwrap_or_else(PortList::common);

        ScanConfig::new(hosts, ports)
            .with_max_concurrency(self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY))
            .with_timeout(
                self.timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_TIMEOUT),
            )
            .with_payloads(self.payloads.unwrap_or_else(default_payloads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_fill_everything() {
        let config = Settings::default().into_scan_config();
        assert_eq!(config.hosts, vec!["scanme.nmap.org", "github.com"]);
        assert_eq!(config.ports, PortList::common());
        assert_eq!(config.max_concurrency, 1024);
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.payloads, default_payloads());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"hosts": ["10.0.0.1"], "ports": [22, 443, 22], "timeout_ms": 2000,
                "payloads": ["HELLO #host#\r\n"]}}"##
        )
        .unwrap();

        let config = Settings::load_from(file.path()).unwrap().into_scan_config();
        assert_eq!(config.hosts, vec!["10.0.0.1"]);
        assert_eq!(config.ports.to_string(), "22,443,22");
        assert_eq!(config.timeout, Duration::from_millis(2000));
        assert_eq!(config.max_concurrency, 1024);
        assert_eq!(config.payloads, vec!["HELLO #host#\r\n"]);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"ports": [0]}}"#).unwrap();
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(ConfigError::InvalidFormat(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"threads": 4}}"#).unwrap();
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_directory_falls_back_to_defaults() {
        assert_eq!(Settings::load_in(None).unwrap(), Settings::default());
    }

    #[test]
    fn test_missing_settings_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: dir.path().join("portscan"),
        };
        assert_eq!(Settings::load_in(Some(&paths)).unwrap(), Settings::default());
    }

    #[test]
    fn test_settings_file_found_in_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: dir.path().to_path_buf(),
        };
        fs::write(paths.settings_file(), r#"{"max_concurrency": 8}"#).unwrap();

        let settings = Settings::load_in(Some(&paths)).unwrap();
        assert_eq!(settings.max_concurrency, Some(8));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            Settings::load_from(&missing),
            Err(ConfigError::ReadFailed { .. })
        ));
    }
}

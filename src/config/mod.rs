//! Configuration management for vmsfab.
//!
//! This module handles loading and saving the list of known OpenVMS hosts
//! together with the per-session settings (temporary directory, terminal
//! width) that the command helpers need.
//!
//! # Configuration File Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/vmsfab/config.yml`
//! - macOS: `~/Library/Application Support/vmsfab/config.yml`
//! - Windows: `C:\Users\<User>\AppData\Roaming\vmsfab\config.yml`
//!
//! # Example Configuration
//!
//! ```yaml
//! hosts:
//!   alpha1:
//!     host: "alpha1.example.com"
//!     user: "SYSTEM"
//!     port: 22
//!     temp_dir: "SYS$SCRATCH"
//!     terminal_width: 255
//!   itanium:
//!     host: "i64.example.com"
//!     user: "OPERATOR"
//! defaults:
//!   host: alpha1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default SSH port
const DEFAULT_SSH_PORT: u16 = 22;

/// Logical name the SSH2 server can always write to
pub const DEFAULT_TEMP_DIR: &str = "TCPIP$SSH_HOME";

/// Default SSH connection timeout in seconds
const DEFAULT_TIMEOUT: u64 = 60;

/// Default number of connection retries
const DEFAULT_CONNECT_RETRIES: u32 = 3;

/// Environment variable consulted when no password is configured
pub const PASSWORD_ENV: &str = "VMSFAB_PASSWORD";

/// Main configuration structure for vmsfab.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OpenVMS hosts, keyed by a short name
    #[serde(default)]
    pub hosts: HashMap<String, HostConfig>,

    /// Default settings that apply when not overridden
    #[serde(default)]
    pub defaults: DefaultSettings,
}

/// Configuration for one OpenVMS host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Hostname or IP address
    pub host: String,

    /// OpenVMS username
    pub user: String,

    /// SSH port (default: 22)
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Password; falls back to `VMSFAB_PASSWORD`, then to a prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Directory (usually a logical name) for temporary files
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,

    /// Terminal width forced before every command, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_width: Option<u16>,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection attempts after the first one fails
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
}

/// Default settings for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// Host used when `--host` is not given
    pub host: Option<String>,

    /// Echo commands and their output tagged with the host name
    #[serde(default = "default_echo")]
    pub echo: bool,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            host: None,
            echo: true,
        }
    }
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_temp_dir() -> String {
    DEFAULT_TEMP_DIR.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_connect_retries() -> u32 {
    DEFAULT_CONNECT_RETRIES
}

fn default_echo() -> bool {
    true
}

impl Config {
    /// Returns the default configuration file path for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vmsfab").join("config.yml"))
    }

    /// Loads configuration from the default location.
    ///
    /// Returns `Ok(Config::default())` if no config file exists.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Loads configuration from a specific file path.
    ///
    /// Returns `Ok(Config::default())` if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read config file: {}\n\n\
                     File path: {}\n\n\
                     Suggestions:\n\
                     • Check file permissions: ls -la {}\n\
                     • Try recreating with: vmsfab config init",
                    e,
                    path.display(),
                    path.display()
                ),
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file: {}\n\n\
                 File path: {}\n\n\
                 Suggestions:\n\
                 • Check YAML syntax in the config file\n\
                 • Verify indentation uses spaces, not tabs\n\n\
                 Example valid config:\n\
                 hosts:\n\
                   alpha1:\n\
                     host: \"alpha1.example.com\"\n\
                     user: \"SYSTEM\"",
                e,
                path.display()
            ))
        })
    }

    /// Saves configuration to the default location.
    pub fn save(&self) -> Result<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Err(Error::Config(
                "Could not determine config directory\n\n\
                 Suggestions:\n\
                 • Check HOME environment variable is set\n\
                 • Verify XDG_CONFIG_HOME is accessible"
                    .to_string(),
            )),
        }
    }

    /// Saves configuration to a specific file path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let contents = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config file {}: {}", path.display(), e),
            ))
        })?;

        Ok(())
    }

    /// Gets a host configuration by name.
    pub fn get_host(&self, name: &str) -> Option<&HostConfig> {
        self.hosts.get(name)
    }

    /// Adds or updates a host configuration.
    pub fn set_host(&mut self, name: String, config: HostConfig) {
        self.hosts.insert(name, config);
    }

    /// Removes a host configuration.
    pub fn remove_host(&mut self, name: &str) -> Option<HostConfig> {
        self.hosts.remove(name)
    }

    /// Lists configured host names, sorted.
    pub fn host_names(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.hosts.keys().collect();
        names.sort();
        names
    }

    /// Resolves a host by configured name, by `user@host[:port]`, or via the
    /// configured default when `name` is `None`.
    pub fn resolve_host(&self, name: Option<&str>) -> Result<HostConfig> {
        let name = match name.or(self.defaults.host.as_deref()) {
            Some(name) => name,
            None => {
                return Err(Error::Config(
                    "No host given and no default host configured".to_string(),
                ))
            }
        };

        if let Some(config) = self.get_host(name) {
            return Ok(config.clone());
        }

        HostConfig::parse_host_string(name).ok_or_else(|| {
            Error::Config(format!(
                "Host '{}' is neither configured nor of the form user@host[:port]",
                name
            ))
        })
    }
}

impl HostConfig {
    /// Creates a new host configuration with required fields.
    pub fn new(host: String, user: String) -> Self {
        Self {
            host,
            user,
            port: DEFAULT_SSH_PORT,
            password: None,
            temp_dir: DEFAULT_TEMP_DIR.to_string(),
            terminal_width: None,
            timeout: DEFAULT_TIMEOUT,
            connect_retries: DEFAULT_CONNECT_RETRIES,
        }
    }

    /// Parses `user@host` or `user@host:port`.
    pub fn parse_host_string(value: &str) -> Option<Self> {
        let (user, rest) = value.split_once('@')?;
        if user.is_empty() || rest.is_empty() {
            return None;
        }
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (rest, DEFAULT_SSH_PORT),
        };
        Some(Self::new(host.to_string(), user.to_string()).with_port(port))
    }

    /// Builder method to set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set the password.
    pub fn with_password(mut self, password: String) -> Self {
        self.password = Some(password);
        self
    }

    /// Builder method to set the temporary directory.
    pub fn with_temp_dir(mut self, temp_dir: String) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Builder method to set the terminal width.
    pub fn with_terminal_width(mut self, width: u16) -> Self {
        self.terminal_width = Some(width);
        self
    }

    /// Builder method to set the timeout.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the SSH connection string (user@host:port).
    pub fn connection_string(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            format!("{}@{}", self.user, self.host)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.hosts.is_empty());
        assert!(config.defaults.echo);
        assert!(config.defaults.host.is_none());
    }

    #[test]
    fn test_host_config_new() {
        let host = HostConfig::new("vms.example.com".to_string(), "SYSTEM".to_string());
        assert_eq!(host.port, 22);
        assert_eq!(host.temp_dir, "TCPIP$SSH_HOME");
        assert!(host.terminal_width.is_none());
        assert!(host.password.is_none());
        assert_eq!(host.connect_retries, 3);
    }

    #[test]
    fn test_host_config_builder() {
        let host = HostConfig::new("vms.example.com".to_string(), "SYSTEM".to_string())
            .with_port(2222)
            .with_temp_dir("SYS$SCRATCH".to_string())
            .with_terminal_width(132)
            .with_timeout(10);

        assert_eq!(host.port, 2222);
        assert_eq!(host.temp_dir, "SYS$SCRATCH");
        assert_eq!(host.terminal_width, Some(132));
        assert_eq!(host.timeout, 10);
    }

    #[test]
    fn test_connection_string() {
        let host = HostConfig::new("vms.example.com".to_string(), "SYSTEM".to_string());
        assert_eq!(host.connection_string(), "SYSTEM@vms.example.com");
        assert_eq!(
            host.with_port(2222).connection_string(),
            "SYSTEM@vms.example.com:2222"
        );
    }

    #[test]
    fn test_parse_host_string() {
        let host = HostConfig::parse_host_string("system@alpha1:2022").unwrap();
        assert_eq!(host.user, "system");
        assert_eq!(host.host, "alpha1");
        assert_eq!(host.port, 2022);

        let host = HostConfig::parse_host_string("operator@alpha1").unwrap();
        assert_eq!(host.port, 22);

        assert!(HostConfig::parse_host_string("alpha1").is_none());
        assert!(HostConfig::parse_host_string("@alpha1").is_none());
        assert!(HostConfig::parse_host_string("a@b:notaport").is_none());
    }

    #[test]
    fn test_resolve_host() {
        let mut config = Config::default();
        config.set_host(
            "alpha1".to_string(),
            HostConfig::new("alpha1.example.com".to_string(), "SYSTEM".to_string()),
        );

        assert_eq!(
            config.resolve_host(Some("alpha1")).unwrap().host,
            "alpha1.example.com"
        );
        assert_eq!(config.resolve_host(Some("op@other")).unwrap().host, "other");
        assert!(config.resolve_host(Some("nowhere")).is_err());
        assert!(config.resolve_host(None).is_err());

        config.defaults.host = Some("alpha1".to_string());
        assert_eq!(config.resolve_host(None).unwrap().user, "SYSTEM");
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yml");

        let mut config = Config::default();
        config.set_host(
            "alpha1".to_string(),
            HostConfig::new("alpha1.example.com".to_string(), "SYSTEM".to_string())
                .with_terminal_width(255),
        );
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        let host = loaded.get_host("alpha1").unwrap();
        assert_eq!(host.terminal_width, Some(255));
        assert_eq!(host.temp_dir, DEFAULT_TEMP_DIR);
        assert_eq!(loaded.host_names(), vec!["alpha1"]);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert!(config.hosts.is_empty());
    }

    #[test]
    fn test_load_minimal_yaml_applies_defaults() {
        let yaml = "hosts:\n  vax:\n    host: vax.example.com\n    user: FIELD\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let host = config.get_host("vax").unwrap();
        assert_eq!(host.port, 22);
        assert_eq!(host.timeout, 60);
        assert_eq!(host.temp_dir, "TCPIP$SSH_HOME");
        assert!(config.defaults.echo);
    }
}

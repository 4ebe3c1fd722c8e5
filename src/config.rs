//! Server configuration.
//!
//! Loaded from a YAML file (see `Config::load`) with environment overrides
//! for the listen address and the document root.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "LBHTTPD_CONFIG";

/// Config file picked up from the working directory when `CONFIG_ENV` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "lbhttpd.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticConfig,
    pub cgi: CgiConfig,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind. Port 0 asks the OS for an ephemeral port.
    pub listen_addr: String,
}

/// Where documents are served from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub root: PathBuf,
    /// Default document for paths ending in `/` and for directories.
    pub index: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CgiConfig {
    /// When set, only URL paths under this prefix may run as CGI.
    /// Otherwise any file with an execute bit does.
    pub path_prefix: Option<String>,
    /// Seconds a CGI child may run. 0 disables the limit.
    pub timeout_secs: u64,
}

/// Upper bounds on request-line and header sizes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_line_len: usize,
    pub max_target_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8888".to_string(),
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("htdocs"),
            index: "index.html".to_string(),
        }
    }
}

impl Default for CgiConfig {
    fn default() -> Self {
        Self {
            path_prefix: None,
            timeout_secs: 30,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_target_len: 255,
        }
    }
}

impl CgiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Config {
    /// Loads the config file named by `LBHTTPD_CONFIG`, falling back to
    /// `lbhttpd.yaml` in the working directory and then to defaults.
    /// `LISTEN` and `DOCUMENT_ROOT` override the file.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                fallback.exists().then_some(fallback)
            });

        let mut cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg = serde_yaml::from_str(raw)?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("LISTEN") {
            self.server.listen_addr = addr;
        }
        if let Some(root) = std::env::var_os("DOCUMENT_ROOT") {
            self.static_files.root = PathBuf::from(root);
        }
    }
}

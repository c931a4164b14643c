use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// `<config_dir>/gpi/config.toml`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|dir| dir.join("gpi").join("config.toml"))
}

fn default_nodes_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("gpi")
    .join("nodes")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Directory holding the external node sources. Watched for changes.
  pub nodes_dir: PathBuf,

  /// Virtual environment the host program is taken from, when set.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub venv_dir: Option<PathBuf>,

  pub host: HostSettings,
  pub watch: WatchSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      nodes_dir: default_nodes_dir(),
      venv_dir: None,
      host: HostSettings::default(),
      watch: WatchSettings::default(),
    }
  }
}

/// How to start the external node-source process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
  pub program: String,
  /// Arguments placed before the nodes directory.
  pub args: Vec<String>,
  pub timeout_ms: u64,
}

impl Default for HostSettings {
  fn default() -> Self {
    Self {
      program: "python3".to_string(),
      args: vec!["-m".to_string(), "gpi_host".to_string()],
      timeout_ms: 10_000,
    }
  }
}

impl HostSettings {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
  pub recursive: bool,
  pub debounce_ms: u64,
  /// File extensions, without the dot, whose changes trigger a reload.
  pub extensions: Vec<String>,
  /// Directory names whose contents are never watched for reloads.
  pub ignore_dirs: Vec<String>,
}

impl Default for WatchSettings {
  fn default() -> Self {
    Self {
      recursive: true,
      debounce_ms: 2000,
      extensions: vec!["py".to_string()],
      ignore_dirs: vec![".venv".to_string(), "__pycache__".to_string()],
    }
  }
}

impl WatchSettings {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

impl Settings {
  /// Load from `path`, or from the default location when `path` is `None`.
  ///
  /// A missing file at the default location yields defaults. An explicitly
  /// given path must exist.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = path {
      return Self::from_file(path);
    }

    match default_config_path() {
      Some(path) if path.exists() => Self::from_file(&path),
      Some(path) => {
        info!(path = %path.display(), "no config file, using defaults");
        Ok(Self::default())
      }
      None => {
        info!("no config directory on this platform, using defaults");
        Ok(Self::default())
      }
    }
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    info!(path = %path.display(), "loaded config");
    Ok(settings)
  }

  pub fn to_toml(&self) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(self)?)
  }

  /// The program to run as the node host, taken from `venv_dir` when set.
  pub fn host_program(&self) -> PathBuf {
    match &self.venv_dir {
      Some(venv) => {
        let bin = if cfg!(windows) { "Scripts" } else { "bin" };
        venv.join(bin).join(&self.host.program)
      }
      None => PathBuf::from(&self.host.program),
    }
  }
}

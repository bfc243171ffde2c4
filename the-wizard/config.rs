use std::{
  fs,
  io::ErrorKind,
  path::{
    Path,
    PathBuf,
  },
  time::Duration,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};
use serde::Deserialize;
use thiserror::Error;

/// Quiet period after the last keystroke before a lookup is issued.
pub const DEFAULT_DEBOUNCE_MS: u64 = 650;
/// At most one error notice per session within this window.
pub const DEFAULT_ERROR_NOTICE_WINDOW_MS: u64 = 1000;
/// How long a dismissed session waits for its resume predicate.
pub const DEFAULT_RESUME_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_RESULTS: usize = 20;

const CONFIG_DIR_ENV: &str = "THE_WIZARD_CONFIG_DIR";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
  #[error("failed to parse config: {0}")]
  BadConfig(#[from] toml::de::Error),
  #[error("failed to read config: {0}")]
  Error(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
  pub debounce:            Duration,
  pub error_notice_window: Duration,
  pub resume_timeout:      Duration,
  pub max_results:         usize,
}

impl Default for WizardConfig {
  fn default() -> Self {
    Self {
      debounce:            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
      error_notice_window: Duration::from_millis(DEFAULT_ERROR_NOTICE_WINDOW_MS),
      resume_timeout:      Duration::from_millis(DEFAULT_RESUME_TIMEOUT_MS),
      max_results:         DEFAULT_MAX_RESULTS,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigRaw {
  debounce_ms:            Option<u64>,
  error_notice_window_ms: Option<u64>,
  resume_timeout_ms:      Option<u64>,
  max_results:            Option<usize>,
}

impl From<ConfigRaw> for WizardConfig {
  fn from(raw: ConfigRaw) -> Self {
    let defaults = Self::default();
    Self {
      debounce:            raw
        .debounce_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.debounce),
      error_notice_window: raw
        .error_notice_window_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.error_notice_window),
      resume_timeout:      raw
        .resume_timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.resume_timeout),
      max_results:         raw.max_results.unwrap_or(defaults.max_results).max(1),
    }
  }
}

impl WizardConfig {
  pub fn from_toml(source: &str) -> Result<Self, ConfigLoadError> {
    let raw: ConfigRaw = toml::from_str(source)?;
    Ok(raw.into())
  }

  /// Load from `path`. A missing file is not an error and yields defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
    match fs::read_to_string(path) {
      Ok(source) => Self::from_toml(&source),
      Err(err) if err.kind() == ErrorKind::NotFound => {
        log::debug!("no config at {}, using defaults", path.display());
        Ok(Self::default())
      },
      Err(err) => Err(err.into()),
    }
  }
}

pub fn config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
    return PathBuf::from(dir);
  }
  match choose_base_strategy() {
    Ok(strategy) => strategy.config_dir().join("the-wizard"),
    Err(err) => {
      log::warn!("unable to find the config directory: {err}");
      PathBuf::from(".")
    },
  }
}

pub fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  match choose_base_strategy() {
    Ok(strategy) => strategy.cache_dir().join("the-wizard").join("the-wizard.log"),
    Err(_) => PathBuf::from("the-wizard.log"),
  }
}

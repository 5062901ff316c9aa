use crate::error::{InspectError, InspectResult};
use crate::INSPECT_CONFIG;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Cached index files older than this are downloaded anew.
    #[serde(default = "default_max_cache_age_seconds")]
    pub max_cache_age_seconds: u64,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    #[serde(default)]
    pub connect_timeout_seconds: Option<u64>,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub http_proxy: Option<String>,

    #[serde(default)]
    pub https_proxy: Option<String>,

    #[serde(default = "default_use_env_proxy")]
    pub use_env_proxy: bool,

    #[serde(default)]
    pub log_level: Verbosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Info,
    Debug,
}

impl Verbosity {
    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::Quiet => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
        }
    }

    pub fn allows(self, level: log::Level) -> bool {
        level <= self.level_filter()
    }
}

impl FromStr for Verbosity {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quiet" | "warn" | "warning" | "error" => Ok(Verbosity::Quiet),
            "info" => Ok(Verbosity::Info),
            "debug" | "trace" => Ok(Verbosity::Debug),
            other => Err(InspectError::ConfigError(format!(
                "unknown log level '{}' (expected quiet, info or debug)",
                other
            ))),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_cache_age_seconds: default_max_cache_age_seconds(),
            timeout_seconds: None,
            connect_timeout_seconds: None,
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            http_proxy: None,
            https_proxy: None,
            use_env_proxy: default_use_env_proxy(),
            log_level: Verbosity::default(),
        }
    }
}

impl Config {
    /// Reads the config file. An explicitly given path must exist; the
    /// default location is optional and falls back to built-in defaults.
    pub fn load(config_path: Option<&str>) -> InspectResult<Self> {
        match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.is_file() {
                    return Err(InspectError::ConfigError(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                Self::from_file(&path)
            }
            None => {
                let path = INSPECT_CONFIG.join("config.toml");
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> InspectResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InspectResult<()> {
        if self.max_redirects == 0 {
            return Err(InspectError::ConfigError(
                "max_redirects must be at least 1".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(InspectError::ConfigError("user_agent must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn max_cache_age(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.max_cache_age_seconds)
    }
}

fn default_cache_dir() -> PathBuf {
    crate::INSPECT_CACHE.clone()
}

fn default_max_cache_age_seconds() -> u64 {
    86400
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("repo-inspect/{}", crate::INSPECT_VERSION)
}

fn default_use_env_proxy() -> bool {
    true
}

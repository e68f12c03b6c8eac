//! Engine configuration.
//!
//! # Responsibility
//! - Resolve runtime settings from CLI arguments, environment variables, an
//!   optional TOML file and compiled defaults.
//!
//! # Invariants
//! - Resolution priority per field: CLI argument, then environment, then
//!   TOML file, then default.
//! - A resolved config has always passed `validate`.

use crate::service::item_service::{
    BatchPolicy, DEFAULT_BATCH_MAX_LABEL_COUNT, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE,
};
use crate::stats::annotator::DEFAULT_SESSION_GAP_SECONDS;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "FUTUREEMO_CONFIG";
pub const ENV_DB_PATH: &str = "FUTUREEMO_DB";
pub const ENV_ADMIN_KEY: &str = "FUTUREEMO_ADMIN_KEY";
pub const ENV_LOG_LEVEL: &str = "FUTUREEMO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FUTUREEMO_LOG_DIR";

const DEFAULT_DB_PATH: &str = "futureemo.db";
const DEFAULT_LOG_DIR: &str = "logs";
const SUPPORTED_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration loading failures.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config `{}`: {message}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { .. } | Self::Invalid(_) => None,
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub admin_key: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

/// TOML file layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
    admin_key: Option<String>,
    batch_size: Option<u32>,
    batch_max_label_count: Option<u32>,
    session_gap_seconds: Option<u64>,
}

/// Resolved runtime settings.
#[derive(Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub admin_key: Option<String>,
    pub batch_size: u32,
    pub batch_max_label_count: u32,
    pub session_gap_seconds: u64,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("db_path", &self.db_path)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "<redacted>"))
            .field("batch_size", &self.batch_size)
            .field("batch_max_label_count", &self.batch_max_label_count)
            .field("session_gap_seconds", &self.session_gap_seconds)
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            admin_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_max_label_count: DEFAULT_BATCH_MAX_LABEL_COUNT,
            session_gap_seconds: DEFAULT_SESSION_GAP_SECONDS,
        }
    }
}

impl EngineConfig {
    /// Resolves configuration from the process environment.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, |name| std::env::var(name).ok())
    }

    /// Resolves configuration with an injectable environment lookup.
    pub fn resolve<E>(overrides: &ConfigOverrides, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| lookup(ENV_CONFIG_PATH).map(PathBuf::from));
        let file = match config_path {
            Some(path) => read_file_config(&path)?,
            None => FileConfig::default(),
        };

        let mut config = Self::default();
        config.apply_file(file);

        if let Some(value) = lookup(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_ADMIN_KEY) {
            config.admin_key = Some(value);
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(value);
        }

        if let Some(value) = &overrides.db_path {
            config.db_path = value.clone();
        }
        if let Some(value) = &overrides.admin_key {
            config.admin_key = Some(value.clone());
        }
        if let Some(value) = &overrides.log_level {
            config.log_level = value.clone();
        }
        if let Some(value) = &overrides.log_dir {
            config.log_dir = value.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document layered over the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file = parse_file_config(content, Path::new("<inline>"))?;
        let mut config = Self::default();
        config.apply_file(file);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "batch_size must be within 1..={MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.batch_max_label_count == 0 {
            return Err(ConfigError::Invalid(
                "batch_max_label_count must be positive".to_string(),
            ));
        }
        if self.session_gap_seconds == 0 {
            return Err(ConfigError::Invalid(
                "session_gap_seconds must be positive".to_string(),
            ));
        }
        let level = self.log_level.trim().to_ascii_lowercase();
        if !SUPPORTED_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unsupported log_level `{}`; expected trace|debug|info|warn|error",
                self.log_level
            )));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            default_limit: self.batch_size,
            max_label_count: self.batch_max_label_count,
        }
    }

    /// `log_dir` made absolute against `base` when relative.
    pub fn absolute_log_dir(&self, base: &Path) -> PathBuf {
        if self.log_dir.is_absolute() {
            self.log_dir.clone()
        } else {
            base.join(&self.log_dir)
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(value) = file.db_path {
            self.db_path = value;
        }
        if let Some(value) = file.log_level {
            self.log_level = value;
        }
        if let Some(value) = file.log_dir {
            self.log_dir = value;
        }
        if let Some(value) = file.admin_key.filter(|key| !key.trim().is_empty()) {
            self.admin_key = Some(value);
        }
        if let Some(value) = file.batch_size {
            self.batch_size = value;
        }
        if let Some(value) = file.batch_max_label_count {
            self.batch_max_label_count = value;
        }
        if let Some(value) = file.session_gap_seconds {
            self.session_gap_seconds = value;
        }
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_file_config(&content, path)
}

fn parse_file_config(content: &str, path: &Path) -> Result<FileConfig, ConfigError> {
    toml::from_str(content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

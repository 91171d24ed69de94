//! Service configuration.
//!
//! Loaded from a TOML file; every section and key is optional. After the
//! file is read, `HMPI_*` environment variables (including ones from a
//! `.env` file) override individual settings:
//!
//! | variable                 | setting                      |
//! |--------------------------|------------------------------|
//! | `HMPI_DEFAULT_STANDARD`  | `engine.default_standard`    |
//! | `HMPI_NON_DETECT_POLICY` | `engine.non_detect_policy`   |
//! | `HMPI_PARALLEL_BATCH`    | `engine.parallel_batch`      |
//! | `HMPI_LOG_LEVEL`         | `logging.level`              |
//! | `HMPI_LOG_FILE`          | `logging.file`               |

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::model::{HmpiError, NonDetectPolicy, RegulatoryStandard, Result};
use crate::standards::StandardSet;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Standard used when a request does not name one: WHO, EPA or CUSTOM.
    pub default_standard: String,
    pub non_detect_policy: NonDetectPolicy,
    /// Spread batch calculations over the rayon thread pool.
    pub parallel_batch: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_standard: "WHO".to_string(),
            non_detect_policy: NonDetectPolicy::default(),
            parallel_batch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            console_timestamps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub engine: EngineSettings,
    pub logging: LoggingSettings,
    /// Rows of the CUSTOM standard set, if any.
    pub custom_standards: Vec<RegulatoryStandard>,
}

impl ServiceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| HmpiError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            HmpiError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reads the optional config file, then applies overrides from the
    /// process environment and `.env`.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `HMPI_*` overrides found through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(standard) = lookup("HMPI_DEFAULT_STANDARD") {
            self.engine.default_standard = standard.trim().to_string();
        }
        if let Some(policy) = lookup("HMPI_NON_DETECT_POLICY") {
            self.engine.non_detect_policy = policy.parse()?;
        }
        if let Some(parallel) = lookup("HMPI_PARALLEL_BATCH") {
            self.engine.parallel_batch = parse_bool("HMPI_PARALLEL_BATCH", &parallel)?;
        }
        if let Some(level) = lookup("HMPI_LOG_LEVEL") {
            self.logging.level = level.parse()?;
        }
        if let Some(file) = lookup("HMPI_LOG_FILE") {
            let file = file.trim();
            self.logging.file = (!file.is_empty()).then(|| file.to_string());
        }
        Ok(())
    }

    /// The CUSTOM standard set, or `None` when no custom rows are configured.
    pub fn custom_standard_set(&self) -> Result<Option<Arc<StandardSet>>> {
        if self.custom_standards.is_empty() {
            return Ok(None);
        }
        StandardSet::new(self.custom_standards.clone()).map(|set| Some(Arc::new(set)))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(HmpiError::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

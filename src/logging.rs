/// Structured logging for the pollution index service
///
/// Provides context-rich logging tagged with the emitting component and,
/// where relevant, the sample identifier. Events go to stderr and, when
/// configured, are appended to a log file for unattended batch runs.
///
/// Built on `tracing`; `init_logger` installs a `tracing-subscriber`
/// registry. The calculation engine never logs, only the service and
/// ingest layers around it do.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

use crate::model::{HmpiError, PollutionCategory, Result, SampleResult};

/// Environment variable holding a full `EnvFilter` directive; takes
/// precedence over the configured level when set.
pub const LOG_FILTER_ENV: &str = "HMPI_LOG";

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl LogLevel {
    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = HmpiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(HmpiError::Config(format!("unknown log level '{}'", other))),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Engine,
    Ingest,
    Export,
    Config,
    Service,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Engine => write!(f, "ENGINE"),
            Component::Ingest => write!(f, "INGEST"),
            Component::Export => write!(f, "EXPORT"),
            Component::Config => write!(f, "CONFIG"),
            Component::Service => write!(f, "SVC"),
        }
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// Only the first call takes effect. Once a subscriber is installed, later
/// calls return `Ok` without creating or opening their log file. Fails only
/// if the log file cannot be opened.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));

    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                tracing_fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    let console = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    // Another thread may have won the race since the check above.
    let _ = if console_timestamps {
        registry.with(console).try_init()
    } else {
        registry.with(console.without_time()).try_init()
    };

    Ok(())
}

fn open_log_file(path: &str) -> Result<fs::File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(component: Component, sample_id: Option<&str>, message: &str) {
    tracing::info!(component = %component, sample = sample_id.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(component: Component, sample_id: Option<&str>, message: &str) {
    tracing::warn!(component = %component, sample = sample_id.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(component: Component, sample_id: Option<&str>, message: &str) {
    tracing::error!(component = %component, sample = sample_id.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(component: Component, sample_id: Option<&str>, message: &str) {
    tracing::debug!(component = %component, sample = sample_id.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Structured Event Helpers
// ---------------------------------------------------------------------------

/// Log a request rejected before reaching the engine.
///
/// Client-side problems (bad shape, unknown standard name) are warnings;
/// anything else points at our own setup and is an error.
pub fn log_rejected_request(operation: &str, err: &HmpiError) {
    let message = format!("{} rejected: {}", operation, err);
    match err {
        HmpiError::InvalidRequest(_) | HmpiError::UnknownStandard(_) | HmpiError::Csv(_) => {
            warn(Component::Service, None, &message)
        }
        _ => error(Component::Service, None, &message),
    }
}

/// Per-category counts of a batch, in ascending severity.
pub fn category_counts(results: &[SampleResult]) -> [(PollutionCategory, usize); 4] {
    let mut counts = [
        (PollutionCategory::Safe, 0),
        (PollutionCategory::Moderate, 0),
        (PollutionCategory::Poor, 0),
        (PollutionCategory::Hazardous, 0),
    ];
    for r in results {
        if let Some(slot) = counts.iter_mut().find(|(c, _)| *c == r.result.category) {
            slot.1 += 1;
        }
    }
    counts
}

/// Log a summary of a batch calculation.
///
/// Logged at warning level when any sample came out Hazardous.
pub fn log_batch_summary(component: Component, results: &[SampleResult]) {
    let counts = category_counts(results);
    let breakdown = counts
        .iter()
        .map(|(category, n)| format!("{} {}", n, category))
        .collect::<Vec<_>>()
        .join(", ");
    let message = format!("Batch complete: {} samples ({})", results.len(), breakdown);

    for r in results.iter().filter(|r| r.result.category == PollutionCategory::Hazardous) {
        debug(
            component,
            Some(&r.sample_id),
            &format!("hazardous: exceeded {}", r.result.exceeded_metals().join(";")),
        );
    }

    if counts[3].1 == 0 {
        info(component, None, &message);
    } else {
        warn(component, None, &message);
    }
}

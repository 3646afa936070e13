//! Structured logging for NWIS acquisition.
//!
//! Thin layer over `tracing`: every event carries the service it concerns
//! (`source`) and, where known, the site id. `init_logger` installs a
//! `tracing-subscriber` formatter writing to the console or appending to a
//! log file. Failures are classified before logging so that caller mistakes
//! stay quiet while service problems are reported as errors.

use crate::model::{AcquisitionError, ConfigurationError};
use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
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
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigurationError::single(
                "log-level",
                format!("unknown log level \"{}\"", other),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Daily values service.
    Daily,
    /// Instantaneous values service.
    Instantaneous,
    Codes,
    Config,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Daily => write!(f, "DV"),
            DataSource::Instantaneous => write!(f, "IV"),
            DataSource::Codes => write!(f, "CODES"),
            DataSource::Config => write!(f, "CONFIG"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the caller asked for something invalid
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - the service answered but the data was not what we needed
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify an acquisition failure by where it came from.
pub fn classify_failure(err: &AcquisitionError) -> FailureType {
    match err {
        AcquisitionError::Configuration(_) => FailureType::Expected,
        AcquisitionError::Transport { .. }
        | AcquisitionError::RemoteService(_)
        | AcquisitionError::Parse(_) => FailureType::Unexpected,
        // Station offline, seasonal, or reporting off its nominal interval
        AcquisitionError::NotFound { .. } | AcquisitionError::DataShape { .. } => {
            FailureType::Unknown
        }
    }
}

// ---------------------------------------------------------------------------
// Initialisation
// ---------------------------------------------------------------------------

/// Install the global subscriber. Returns `false` if one was already set,
/// in which case the existing subscriber stays in place.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_max_level(min_level.as_filter())
        .with_target(false);

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                return builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init()
                    .is_ok();
            }
            Err(e) => eprintln!("Failed to open log file {}: {}", path, e),
        }
    }

    if console_timestamps {
        builder.with_writer(std::io::stderr).try_init().is_ok()
    } else {
        builder
            .without_time()
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

pub fn info(source: DataSource, site_id: Option<&str>, message: &str) {
    tracing::info!(source = %source, site = site_id.unwrap_or("-"), "{}", message);
}

pub fn warn(source: DataSource, site_id: Option<&str>, message: &str) {
    tracing::warn!(source = %source, site = site_id.unwrap_or("-"), "{}", message);
}

pub fn error(source: DataSource, site_id: Option<&str>, message: &str) {
    tracing::error!(source = %source, site = site_id.unwrap_or("-"), "{}", message);
}

pub fn debug(source: DataSource, site_id: Option<&str>, message: &str) {
    tracing::debug!(source = %source, site = site_id.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed operation at a level chosen by its classification.
pub fn log_failure(source: DataSource, site_id: Option<&str>, operation: &str, err: &AcquisitionError) {
    let failure_type = classify_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(source, site_id, &message),
        FailureType::Unexpected => error(source, site_id, &message),
        FailureType::Unknown => warn(source, site_id, &message),
    }
}

/// Log the outcome of a batch of lookups.
pub fn log_batch_summary(source: DataSource, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Batch complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(source, None, &message);
    } else if successful == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Interval, RemoteServiceError};

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parses_cli_spelling() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        let bad_input = AcquisitionError::from(ConfigurationError::single("sites", "empty"));
        assert_eq!(classify_failure(&bad_input), FailureType::Expected);

        let remote = AcquisitionError::from(RemoteServiceError {
            url: "u".to_string(),
            status: 200,
            body: "error".to_string(),
        });
        assert_eq!(classify_failure(&remote), FailureType::Unexpected);

        let shape = AcquisitionError::DataShape {
            series: "05568500.USGS.00065.15Min".to_string(),
            timestamp: "2024-05-01T12:07:00-05:00".to_string(),
            interval: Interval::Minutes(15),
        };
        assert_eq!(classify_failure(&shape), FailureType::Unknown);
    }

    #[test]
    fn test_second_init_is_refused() {
        init_logger(LogLevel::Debug, None, false);
        assert!(!init_logger(LogLevel::Info, None, true));
    }
}

//! Core data types for NWIS time series acquisition.
//!
//! This module defines the shared domain model imported by all other modules:
//! intervals, date ranges, request enums, the returned time series records,
//! the compact series identifier and the error taxonomy. It performs no I/O.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Well-known codes
// ---------------------------------------------------------------------------

/// USGS parameter code for discharge (streamflow), in cubic feet per second.
pub const PARAM_DISCHARGE: &str = "00060";

/// USGS parameter code for gage height (stage), in feet.
pub const PARAM_STAGE: &str = "00065";

/// USGS statistic code for the daily mean.
pub const STAT_MEAN: &str = "00003";

/// Value the service uses in place of a missing measurement.
pub const NO_DATA_SENTINEL: f64 = -999999.0;

// ---------------------------------------------------------------------------
// Acquisition mode
// ---------------------------------------------------------------------------

/// How much an acquisition call reads.
///
/// `Discovery` only defines the series (no date bounds are sent and no
/// values are kept); `Run` reads the full requested period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcquisitionMode {
    Discovery,
    Run,
}

impl AcquisitionMode {
    pub fn reads_data(self) -> bool {
        matches!(self, AcquisitionMode::Run)
    }
}

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// Sampling interval of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Interval {
    /// One value per calendar day.
    Day,
    /// Fixed step in minutes. Whole hours are stored as minutes too.
    Minutes(u32),
    /// No fixed step; timestamps are kept exactly as received.
    Irregular,
}

impl Interval {
    /// Step length in seconds, or `None` for day and irregular series.
    pub fn step_seconds(&self) -> Option<i64> {
        match self {
            Interval::Minutes(m) => Some(i64::from(*m) * 60),
            _ => None,
        }
    }

    pub fn is_irregular(&self) -> bool {
        matches!(self, Interval::Irregular)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Day => write!(f, "Day"),
            Interval::Minutes(m) if m % 60 == 0 => write!(f, "{}Hour", m / 60),
            Interval::Minutes(m) => write!(f, "{}Min", m),
            Interval::Irregular => write!(f, "Irregular"),
        }
    }
}

impl FromStr for Interval {
    type Err = ConfigurationError;

    /// Accepts `Day`, `1Day`, `<n>Min`, `<n>Minute`, `<n>Hour`, `Irregular`
    /// and `Irreg`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "day" | "1day" => return Ok(Interval::Day),
            "irregular" | "irreg" => return Ok(Interval::Irregular),
            _ => {}
        }

        let invalid = || {
            ConfigurationError::single("interval", format!("unrecognized interval \"{}\"", s.trim()))
        };

        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (digits, unit) = token.split_at(split);
        let count: u32 = digits.parse().map_err(|_| invalid())?;
        if count == 0 {
            return Err(invalid());
        }

        match unit {
            "min" | "mins" | "minute" | "minutes" => Ok(Interval::Minutes(count)),
            "hour" | "hours" => count
                .checked_mul(60)
                .map(Interval::Minutes)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Optional read window. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    /// Whole-day range from the start of `start` to the start of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_hms_opt(0, 0, 0),
            end: end.and_hms_opt(0, 0, 0),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns true if `t` falls inside the window (bounds inclusive).
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start.is_none_or(|s| t >= s) && self.end.is_none_or(|e| t <= e)
    }
}

// ---------------------------------------------------------------------------
// Request enums
// ---------------------------------------------------------------------------

/// Site status filter sent as `siteStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteStatus {
    #[default]
    All,
    Active,
    Inactive,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteStatus::All => write!(f, "All"),
            SiteStatus::Active => write!(f, "Active"),
            SiteStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

impl FromStr for SiteStatus {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(SiteStatus::All),
            "active" => Ok(SiteStatus::Active),
            "inactive" => Ok(SiteStatus::Inactive),
            other => Err(ConfigurationError::single(
                "siteStatus",
                format!("unknown site status \"{}\"", other),
            )),
        }
    }
}

/// Response format requested with `format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// WaterML 1.1 rendered as JSON.
    #[default]
    Json,
    WaterMl,
    WaterMl2,
    Rdb,
}

impl OutputFormat {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::WaterMl => "WaterML",
            OutputFormat::WaterMl2 => "WaterML-2.0",
            OutputFormat::Rdb => "rdb",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "waterml" | "waterml,1.1" | "waterml-1.1" => Ok(OutputFormat::WaterMl),
            "waterml-2.0" | "waterml,2.0" | "waterml2" => Ok(OutputFormat::WaterMl2),
            "rdb" => Ok(OutputFormat::Rdb),
            other => Err(ConfigurationError::single(
                "format",
                format!("unsupported format \"{}\"", other),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Compact series identifier
// ---------------------------------------------------------------------------

/// Compact identifier of one series:
/// `<site>.<agency>.<parameter>[-<statistic>].<interval>`, where the agency
/// slot may be empty (`09010500..00060-00003.Day`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesIdentifier {
    pub site_id: String,
    pub agency: Option<String>,
    pub parameter_code: String,
    pub statistic_code: Option<String>,
    pub interval: Interval,
}

impl SeriesIdentifier {
    /// The data type part: parameter code, plus `-statistic` when present.
    pub fn data_type(&self) -> String {
        match &self.statistic_code {
            Some(stat) => format!("{}-{}", self.parameter_code, stat),
            None => self.parameter_code.clone(),
        }
    }

    /// Whether this series answers a request for `wanted`. A request without
    /// a statistic accepts whichever statistic the service returned.
    pub fn satisfies(&self, wanted: &SeriesIdentifier) -> bool {
        self.site_id == wanted.site_id
            && self.parameter_code == wanted.parameter_code
            && self.interval == wanted.interval
            && wanted
                .statistic_code
                .as_ref()
                .is_none_or(|stat| self.statistic_code.as_ref() == Some(stat))
    }
}

impl fmt::Display for SeriesIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.site_id,
            self.agency.as_deref().unwrap_or(""),
            self.data_type(),
            self.interval
        )
    }
}

impl FromStr for SeriesIdentifier {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 4 {
            return Err(ConfigurationError::single(
                "identifier",
                format!(
                    "\"{}\" must have the form Site.Agency.Parameter[-Statistic].Interval",
                    s.trim()
                ),
            ));
        }

        let mut errors = ConfigurationError::new();

        let site_id = parts[0].trim();
        if site_id.is_empty() {
            errors.push("identifier", Some(0), "site id is empty");
        }

        let agency = Some(parts[1].trim())
            .filter(|a| !a.is_empty())
            .map(String::from);

        let (parameter_code, statistic_code) = match parts[2].split_once('-') {
            Some((param, stat)) => (param.trim(), Some(stat.trim())),
            None => (parts[2].trim(), None),
        };
        if parameter_code.is_empty() {
            errors.push("identifier", Some(2), "parameter code is empty");
        }
        if statistic_code.is_some_and(str::is_empty) {
            errors.push("identifier", Some(2), "statistic code is empty");
        }

        let interval = match parts[3].parse::<Interval>() {
            Ok(interval) => Some(interval),
            Err(e) => {
                errors.extend(e);
                None
            }
        };

        errors.into_result()?;

        Ok(SeriesIdentifier {
            site_id: site_id.to_string(),
            agency,
            parameter_code: parameter_code.to_string(),
            statistic_code: statistic_code.map(String::from),
            interval: interval.unwrap_or(Interval::Irregular),
        })
    }
}

// ---------------------------------------------------------------------------
// Time series records
// ---------------------------------------------------------------------------

/// One decoded measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<FixedOffset>,
    /// `None` where the service reported its no-data sentinel.
    pub value: Option<f64>,
    /// Joined qualifier codes, e.g. "P" (provisional) or "A" (approved).
    pub flag: String,
}

/// A decoded time series, owned by the caller once returned.
///
/// In discovery mode `points` is always empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    pub identifier: SeriesIdentifier,
    pub site_name: String,
    pub description: String,
    pub units: String,
    pub interval: Interval,
    pub points: Vec<DataPoint>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// One problem found while validating caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigProblem {
    /// Offending input field, e.g. `bBox` or `sites`.
    pub field: String,
    /// Component index within the field, where one applies.
    pub index: Option<usize>,
    pub message: String,
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]: {}", self.field, i, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Bad or ambiguous input, caught before any network call. Collects every
/// problem found rather than stopping at the first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("invalid request: {}", join_problems(.problems))]
pub struct ConfigurationError {
    problems: Vec<ConfigProblem>,
}

fn join_problems(problems: &[ConfigProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigurationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut e = Self::new();
        e.push(field, None, message);
        e
    }

    pub fn push(&mut self, field: &str, index: Option<usize>, message: impl Into<String>) {
        self.problems.push(ConfigProblem {
            field: field.to_string(),
            index,
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ConfigurationError) {
        self.problems.extend(other.problems);
    }

    pub fn problems(&self) -> &[ConfigProblem] {
        &self.problems
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// True if any problem names `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.problems.iter().any(|p| p.field == field)
    }

    /// `Ok(())` if nothing was collected, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ConfigurationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Longest body prefix carried into rendered messages.
const BODY_FRAGMENT_LEN: usize = 200;

/// Application-level error reported by the remote service inside the
/// response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote service error from {url} (HTTP {status}): {}", body_fragment(.body))]
pub struct RemoteServiceError {
    pub url: String,
    pub status: u16,
    /// The raw, unmodified response body.
    pub body: String,
}

impl RemoteServiceError {
    /// Leading part of the body, cut on a character boundary.
    pub fn fragment(&self) -> &str {
        body_fragment(&self.body)
    }
}

fn body_fragment(body: &str) -> &str {
    match body.char_indices().nth(BODY_FRAGMENT_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Errors that can arise when acquiring NWIS time series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Connection failure, DNS/TLS error or timeout.
    #[error("transport error for {url}: {message}")]
    Transport {
        url: String,
        message: String,
        timed_out: bool,
    },

    #[error(transparent)]
    RemoteService(#[from] RemoteServiceError),

    /// A timestamp did not align to the declared interval.
    #[error("{series}: timestamp {timestamp} is not aligned to interval {interval}")]
    DataShape {
        series: String,
        timestamp: String,
        interval: Interval,
    },

    /// A single-series lookup returned no records.
    #[error("no time series found for {identifier}")]
    NotFound { identifier: String },

    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T, E = AcquisitionError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

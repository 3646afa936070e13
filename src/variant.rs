//! Per-service policy for the daily values and instantaneous values APIs.
//!
//! Both services share one client; everything that differs between them
//! (interval handling, statistic filter, date precision, endpoint) is
//! answered here.

use crate::logging::DataSource;
use crate::model::{ConfigurationError, Interval};
use chrono::NaiveDateTime;
use std::fmt;

pub const DV_BASE_URL: &str = "https://waterservices.usgs.gov/nwis/dv/";
pub const IV_BASE_URL: &str = "https://waterservices.usgs.gov/nwis/iv/";

/// Instantaneous intervals must be a multiple of this many minutes.
pub const IV_STEP_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceVariant {
    /// Daily statistics; interval fixed at one day, `statCd` supported.
    Daily,
    /// Instantaneous readings; interval supplied by the caller.
    Instantaneous,
}

impl ServiceVariant {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ServiceVariant::Daily => DV_BASE_URL,
            ServiceVariant::Instantaneous => IV_BASE_URL,
        }
    }

    pub fn data_source(&self) -> DataSource {
        match self {
            ServiceVariant::Daily => DataSource::Daily,
            ServiceVariant::Instantaneous => DataSource::Instantaneous,
        }
    }

    pub fn supports_statistics(&self) -> bool {
        matches!(self, ServiceVariant::Daily)
    }

    /// Whether decoded timestamps are checked against the interval hint.
    /// Daily values are dates and are never coerced.
    pub fn reconciles_intervals(&self) -> bool {
        matches!(self, ServiceVariant::Instantaneous)
    }

    /// Resolves the caller's interval hint to the interval used for decoding.
    ///
    /// Daily accepts no hint or `Day`. Instantaneous accepts a multiple of
    /// 15 minutes or `Irregular`; no hint means `Irregular`.
    pub fn resolve_interval(&self, hint: Option<Interval>) -> Result<Interval, ConfigurationError> {
        match (self, hint) {
            (ServiceVariant::Daily, None | Some(Interval::Day)) => Ok(Interval::Day),
            (ServiceVariant::Instantaneous, None | Some(Interval::Irregular)) => Ok(Interval::Irregular),
            (ServiceVariant::Instantaneous, Some(Interval::Minutes(m))) if m % IV_STEP_MINUTES == 0 => {
                Ok(Interval::Minutes(m))
            }
            (_, Some(other)) => Err(ConfigurationError::single(
                "interval",
                format!("{} is not supported by the {} service", other, self),
            )),
        }
    }

    /// Whether a compact identifier may carry this interval.
    pub fn accepts_identifier_interval(&self, interval: Interval) -> bool {
        match (self, interval) {
            (ServiceVariant::Daily, Interval::Day) => true,
            (ServiceVariant::Instantaneous, Interval::Minutes(m)) => m % IV_STEP_MINUTES == 0,
            _ => false,
        }
    }

    /// Formats a date bound for `startDT` / `endDT`.
    pub fn format_date(&self, t: NaiveDateTime) -> String {
        match self {
            ServiceVariant::Daily => t.format("%Y-%m-%d").to_string(),
            ServiceVariant::Instantaneous => t.format("%Y-%m-%dT%H:%M").to_string(),
        }
    }
}

impl fmt::Display for ServiceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceVariant::Daily => write!(f, "daily values"),
            ServiceVariant::Instantaneous => write!(f, "instantaneous values"),
        }
    }
}

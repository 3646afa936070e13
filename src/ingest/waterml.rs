//! Payload decoding: the decoder contract and the built-in WaterML JSON decoder.
//!
//! The DV and IV services return WaterML 1.1 rendered as JSON when asked for
//! `format=json`. Each `value.timeSeries[]` entry becomes one
//! `TimeSeriesRecord`.
//!
//! Key parsing notes:
//!   - Measurement values arrive as JSON *strings*, not numbers.
//!   - The no-data sentinel (`noDataValue`, normally -999999) becomes a
//!     missing value rather than a reading.
//!   - IV timestamps carry a UTC offset; DV timestamps do not and are
//!     read as UTC midnight.
//!   - The daily statistic code is in `variable.options.option[]` under the
//!     name "Statistic".

use crate::ingest::interval;
use crate::model::{
    AcquisitionError, DataPoint, DateRange, Interval, Result, SeriesIdentifier, TimeSeriesRecord,
    NO_DATA_SENTINEL,
};
use crate::variant::ServiceVariant;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Decoder contract
// ---------------------------------------------------------------------------

/// Everything a decoder needs besides the body itself.
#[derive(Debug, Clone)]
pub struct DecodeRequest<'a> {
    pub body: &'a str,
    pub variant: ServiceVariant,
    /// Declared interval (daily) or the caller's hint (instantaneous).
    pub interval: Interval,
    /// Points outside this window are dropped.
    pub read_window: DateRange,
    /// False in discovery mode: records are returned without points.
    pub read_data: bool,
    pub require_interval_match: bool,
}

/// Converts a raw response body into time series records.
pub trait PayloadDecoder: Send + Sync {
    fn decode(&self, req: &DecodeRequest<'_>) -> Result<Vec<TimeSeriesRecord>>;
}

// ---------------------------------------------------------------------------
// WaterML JSON response structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    value: ValueBlock,
}

#[derive(Debug, Deserialize)]
struct ValueBlock {
    #[serde(rename = "timeSeries", default)]
    time_series: Vec<TimeSeriesJson>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesJson {
    #[serde(rename = "sourceInfo")]
    source_info: SourceInfo,
    variable: Variable,
    #[serde(default)]
    values: Vec<ValuesJson>,
}

#[derive(Debug, Deserialize)]
struct SourceInfo {
    #[serde(rename = "siteName", default)]
    site_name: String,
    #[serde(rename = "siteCode", default)]
    site_code: Vec<SiteCode>,
}

#[derive(Debug, Deserialize)]
struct SiteCode {
    value: String,
    #[serde(rename = "agencyCode")]
    agency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Variable {
    #[serde(rename = "variableCode", default)]
    variable_code: Vec<VariableCode>,
    #[serde(rename = "variableName", default)]
    variable_name: String,
    #[serde(rename = "variableDescription", default)]
    variable_description: String,
    unit: Option<Unit>,
    options: Option<VariableOptions>,
    #[serde(rename = "noDataValue")]
    no_data_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VariableCode {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Unit {
    #[serde(rename = "unitCode", default)]
    unit_code: String,
}

#[derive(Debug, Deserialize)]
struct VariableOptions {
    #[serde(default)]
    option: Vec<VariableOption>,
}

#[derive(Debug, Deserialize)]
struct VariableOption {
    #[serde(default)]
    name: String,
    #[serde(rename = "optionCode")]
    option_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValuesJson {
    #[serde(default)]
    value: Vec<ValueJson>,
}

#[derive(Debug, Deserialize)]
struct ValueJson {
    value: String,
    #[serde(default)]
    qualifiers: Vec<String>,
    #[serde(rename = "dateTime")]
    date_time: String,
}

// ---------------------------------------------------------------------------
// Built-in decoder
// ---------------------------------------------------------------------------

/// Decoder for the services' `format=json` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaterMlJsonDecoder;

impl PayloadDecoder for WaterMlJsonDecoder {
    /// # Errors
    /// - `Parse`: malformed JSON, or a series without site or variable code.
    /// - `DataShape`: an instantaneous timestamp off the interval while a
    ///   match is required.
    fn decode(&self, req: &DecodeRequest<'_>) -> Result<Vec<TimeSeriesRecord>> {
        let envelope: Envelope = serde_json::from_str(req.body)
            .map_err(|e| AcquisitionError::Parse(format!("WaterML JSON: {}", e)))?;

        let mut records = Vec::with_capacity(envelope.value.time_series.len());
        let mut seen = HashSet::new();

        for ts in envelope.value.time_series {
            let record = decode_series(ts, req)?;
            // Discovery returns one placeholder per distinct series.
            if !req.read_data && !seen.insert(record.identifier.clone()) {
                continue;
            }
            records.push(record);
        }

        Ok(records)
    }
}

fn decode_series(ts: TimeSeriesJson, req: &DecodeRequest<'_>) -> Result<TimeSeriesRecord> {
    let site = ts
        .source_info
        .site_code
        .into_iter()
        .next()
        .ok_or_else(|| AcquisitionError::Parse("timeSeries entry has no siteCode".to_string()))?;

    let parameter_code = ts
        .variable
        .variable_code
        .first()
        .map(|c| c.value.clone())
        .ok_or_else(|| {
            AcquisitionError::Parse(format!("timeSeries entry for {} has no variableCode", site.value))
        })?;

    let statistic_code = if req.variant.supports_statistics() {
        ts.variable
            .options
            .as_ref()
            .and_then(|o| o.option.iter().find(|opt| opt.name == "Statistic"))
            .and_then(|opt| opt.option_code.clone())
    } else {
        None
    };

    let identifier = SeriesIdentifier {
        site_id: site.value,
        agency: site.agency_code.filter(|a| !a.is_empty()),
        parameter_code,
        statistic_code,
        interval: req.interval,
    };

    let description = if ts.variable.variable_description.is_empty() {
        ts.variable.variable_name
    } else {
        ts.variable.variable_description
    };

    let points = if req.read_data {
        let no_data = ts.variable.no_data_value.unwrap_or(NO_DATA_SENTINEL);
        let points = decode_points(&ts.values, no_data)?;
        let mut points = if req.variant.reconciles_intervals() {
            interval::reconcile(
                &identifier.to_string(),
                points,
                req.interval,
                req.require_interval_match,
                req.variant.data_source(),
            )?
        } else {
            points
        };
        // Snapping can move a point across a window bound, so trim last.
        points.retain(|p| req.read_window.contains(p.timestamp.naive_local()));
        points
    } else {
        Vec::new()
    };

    Ok(TimeSeriesRecord {
        identifier,
        site_name: ts.source_info.site_name,
        description,
        units: ts.variable.unit.map(|u| u.unit_code).unwrap_or_default(),
        interval: req.interval,
        points,
    })
}

fn decode_points(blocks: &[ValuesJson], no_data: f64) -> Result<Vec<DataPoint>> {
    let mut points = Vec::new();

    for raw in blocks.iter().flat_map(|b| b.value.iter()) {
        let timestamp = parse_timestamp(&raw.date_time)?;

        let value: f64 = raw.value.trim().parse().map_err(|_| {
            AcquisitionError::Parse(format!("value \"{}\" at {} is not a number", raw.value, raw.date_time))
        })?;

        points.push(DataPoint {
            timestamp,
            value: if (value - no_data).abs() < f64::EPSILON { None } else { Some(value) },
            flag: raw.qualifiers.join(","),
        });
    }

    // Several method blocks may interleave; order the series by time.
    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

/// Parses `2024-05-01T12:00:00.000-05:00`, or an offset-less DV timestamp
/// which is taken as UTC.
fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t);
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|_| AcquisitionError::Parse(format!("unrecognized dateTime \"{}\"", text)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

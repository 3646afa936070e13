//! Single-series lookup from a compact identifier.
//!
//! `09010500..00060-00003.Day` names one site, one parameter and (for daily
//! values) one statistic. `locate` checks the identifier against the
//! service, `to_params` turns it into a one-site request, and
//! `select_single` insists on exactly one matching record in the result.

use crate::constraint::LocationInputs;
use crate::logging::{self, DataSource};
use crate::model::{AcquisitionError, ConfigurationError, DateRange, Result, SeriesIdentifier, TimeSeriesRecord};
use crate::service::AcquisitionParams;
use crate::variant::ServiceVariant;

/// Parses `identifier` and checks it is valid for `variant`.
///
/// The interval must be one the service produces (`Day` for daily values,
/// a multiple of 15 minutes for instantaneous values). A statistic is only
/// allowed for daily values.
pub fn locate(identifier: &str, variant: ServiceVariant) -> std::result::Result<SeriesIdentifier, ConfigurationError> {
    let id: SeriesIdentifier = identifier.parse()?;

    let mut errors = ConfigurationError::new();
    if !variant.accepts_identifier_interval(id.interval) {
        errors.push(
            "interval",
            Some(3),
            format!("{} identifiers cannot use interval {}", variant, id.interval),
        );
    }
    if id.statistic_code.is_some() && !variant.supports_statistics() {
        errors.push(
            "identifier",
            Some(2),
            format!("{} identifiers cannot carry a statistic code", variant),
        );
    }
    errors.into_result()?;

    Ok(id)
}

/// One-site, one-parameter request parameters for `id`.
///
/// Alignment to the identifier's interval is required; there is no
/// coercion on single-series reads.
pub fn to_params(id: &SeriesIdentifier, date_range: DateRange) -> AcquisitionParams {
    AcquisitionParams {
        location: LocationInputs::for_sites(&[id.site_id.as_str()]),
        date_range,
        parameter_codes: vec![id.parameter_code.clone()],
        statistic_codes: id.statistic_code.iter().cloned().collect(),
        agency_code: id.agency.clone(),
        interval_hint: Some(id.interval),
        require_interval_match: true,
        ..AcquisitionParams::default()
    }
}

/// Picks the record for `id` out of an acquisition result.
///
/// The returned record carries `id` itself, so its identifier prints back
/// to the caller's string.
pub fn select_single(id: &SeriesIdentifier, records: Vec<TimeSeriesRecord>) -> Result<TimeSeriesRecord> {
    let total = records.len();
    let mut matching = records.into_iter().filter(|r| r.identifier.satisfies(id));

    let Some(mut record) = matching.next() else {
        return Err(AcquisitionError::NotFound {
            identifier: id.to_string(),
        });
    };

    let extra = matching.count();
    if extra > 0 {
        logging::warn(
            DataSource::System,
            Some(&id.site_id),
            &format!("{} matched {} series, keeping the first", id, extra + 1),
        );
    }
    if total > extra + 1 {
        logging::debug(
            DataSource::System,
            Some(&id.site_id),
            &format!("ignored {} unrelated series in response", total - extra - 1),
        );
    }

    record.identifier = id.clone();
    Ok(record)
}

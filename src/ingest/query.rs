//! Query construction for the NWIS daily and instantaneous values services.
//!
//! A `FetchRequest` is built fresh for every call and turned into one
//! deterministic query string. Parameters always appear in the same order:
//! location, date range, format, parameters, statistics, site status,
//! site types, agency. List filters are sent as a single comma-joined value,
//! never as repeated keys.

use crate::constraint::ConstraintSet;
use crate::model::{AcquisitionMode, DateRange, Interval, OutputFormat, SiteStatus};
use crate::variant::ServiceVariant;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything needed to issue and decode one service request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub variant: ServiceVariant,
    pub mode: AcquisitionMode,
    pub base_uri: String,
    pub constraint: ConstraintSet,
    /// Always unbounded in discovery mode.
    pub date_range: DateRange,
    /// Empty means no parameter filter.
    pub parameter_codes: Vec<String>,
    /// Daily service only; empty means no statistic filter.
    pub statistic_codes: Vec<String>,
    pub site_status: SiteStatus,
    pub site_type_codes: Vec<String>,
    pub agency_code: Option<String>,
    pub format: OutputFormat,
    /// Interval the decoder reconciles timestamps against.
    pub interval: Interval,
    pub require_interval_match: bool,
}

// ---------------------------------------------------------------------------
// Query string
// ---------------------------------------------------------------------------

/// Builds the query string for a request. Equal requests always produce
/// byte-identical output.
pub fn build_query(req: &FetchRequest) -> String {
    let mut pairs: Vec<(&str, String)> = Vec::new();

    pairs.push((req.constraint.query_key(), req.constraint.query_value()));

    // Discovery never sends date bounds, so a definition lookup cannot turn
    // into a bulk historical download.
    if req.mode.reads_data() {
        if let Some(start) = req.date_range.start {
            pairs.push(("startDT", req.variant.format_date(start)));
        }
        if let Some(end) = req.date_range.end {
            pairs.push(("endDT", req.variant.format_date(end)));
        }
    }

    pairs.push(("format", req.format.as_query_value().to_string()));

    if !req.parameter_codes.is_empty() {
        pairs.push(("parameterCd", req.parameter_codes.join(",")));
    }

    if req.variant.supports_statistics() && !req.statistic_codes.is_empty() {
        pairs.push(("statCd", req.statistic_codes.join(",")));
    }

    pairs.push(("siteStatus", req.site_status.to_string()));

    if !req.site_type_codes.is_empty() {
        pairs.push(("siteType", req.site_type_codes.join(",")));
    }

    if let Some(agency) = req.agency_code.as_deref().filter(|a| !a.is_empty()) {
        pairs.push(("agencyCd", agency.to_string()));
    }

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Full request URL: the configured base URI plus the query string.
pub fn build_url(req: &FetchRequest) -> String {
    let separator = if req.base_uri.contains('?') { '&' } else { '?' };
    format!("{}{}{}", req.base_uri, separator, build_query(req))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::BoundingBox;
    use crate::variant::{DV_BASE_URL, IV_BASE_URL};
    use chrono::NaiveDate;

    fn daily_request() -> FetchRequest {
        FetchRequest {
            variant: ServiceVariant::Daily,
            mode: AcquisitionMode::Run,
            base_uri: DV_BASE_URL.to_string(),
            constraint: ConstraintSet::Sites(vec!["09010500".to_string()]),
            date_range: DateRange::from_dates(
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
            ),
            parameter_codes: vec!["00060".to_string()],
            statistic_codes: vec!["00003".to_string()],
            site_status: SiteStatus::All,
            site_type_codes: Vec::new(),
            agency_code: None,
            format: OutputFormat::WaterMl,
            interval: Interval::Day,
            require_interval_match: true,
        }
    }

    #[test]
    fn test_daily_query_matches_reference_string() {
        assert_eq!(
            build_query(&daily_request()),
            "sites=09010500&startDT=2020-01-01&endDT=2020-01-31&format=WaterML\
             &parameterCd=00060&statCd=00003&siteStatus=All"
        );
    }

    #[test]
    fn test_query_is_deterministic() {
        let a = daily_request();
        let b = daily_request();
        assert_eq!(build_query(&a).as_bytes(), build_query(&b).as_bytes());
    }

    #[test]
    fn test_discovery_never_sends_dates() {
        let mut req = daily_request();
        req.mode = AcquisitionMode::Discovery;
        let query = build_query(&req);
        assert!(!query.contains("startDT"), "got {}", query);
        assert!(!query.contains("endDT"), "got {}", query);
        assert!(query.starts_with("sites=09010500&format="));
    }

    #[test]
    fn test_full_parameter_order() {
        let mut req = daily_request();
        req.constraint = ConstraintSet::States(vec!["CO".to_string()]);
        req.parameter_codes = vec!["00060".to_string(), "00065".to_string()];
        req.statistic_codes = vec!["00001".to_string(), "00003".to_string()];
        req.site_status = SiteStatus::Active;
        req.site_type_codes = vec!["ST".to_string(), "LK".to_string()];
        req.agency_code = Some("USGS".to_string());
        req.format = OutputFormat::Json;

        assert_eq!(
            build_query(&req),
            "stateCd=CO&startDT=2020-01-01&endDT=2020-01-31&format=json\
             &parameterCd=00060,00065&statCd=00001,00003&siteStatus=Active\
             &siteType=ST,LK&agencyCd=USGS"
        );
    }

    #[test]
    fn test_empty_filters_are_omitted() {
        let mut req = daily_request();
        req.parameter_codes.clear();
        req.statistic_codes.clear();
        req.date_range = DateRange::unbounded();
        req.agency_code = Some(String::new());
        assert_eq!(build_query(&req), "sites=09010500&format=WaterML&siteStatus=All");
    }

    #[test]
    fn test_instantaneous_never_sends_statistics() {
        let mut req = daily_request();
        req.variant = ServiceVariant::Instantaneous;
        req.base_uri = IV_BASE_URL.to_string();
        req.date_range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(12, 0, 0),
            None,
        );
        let query = build_query(&req);
        assert!(!query.contains("statCd"));
        assert!(query.contains("startDT=2024-05-01T12:00"), "got {}", query);
        assert!(!query.contains("endDT"));
    }

    #[test]
    fn test_bounding_box_uses_six_decimals() {
        let mut req = daily_request();
        req.constraint = ConstraintSet::BoundingBox(BoundingBox {
            west: -89.5,
            south: 40.25,
            east: -88.0,
            north: 41.125,
        });
        assert!(build_query(&req).starts_with("bBox=-89.500000,40.250000,-88.000000,41.125000&"));
    }

    #[test]
    fn test_url_joins_base_and_query() {
        let url = build_url(&daily_request());
        assert!(url.starts_with("https://waterservices.usgs.gov/nwis/dv/?sites=09010500&"));

        let mut req = daily_request();
        req.base_uri = "http://localhost/dv/?token=abc".to_string();
        assert!(build_url(&req).starts_with("http://localhost/dv/?token=abc&sites="));
    }
}

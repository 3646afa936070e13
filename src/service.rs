//! Acquisition orchestration: validate, build, fetch, decode.
//!
//! `NwisClient` serves one service variant. A call runs in one of two modes:
//!
//! - `Discovery`: dates stripped, payload decoded without values; returns
//!   one placeholder record per distinct series.
//! - `Run`: full request, full records.
//!
//! Any failure along the way aborts the whole call. Nothing is retried and
//! no partial result is ever returned.

use crate::codes::{CodeKind, CodeTable};
use crate::config::ClientConfig;
use crate::constraint::{ConstraintSet, LocationInputs};
use crate::ingest::fetch::{self, HttpTransport, ReqwestTransport};
use crate::ingest::query::{self, FetchRequest};
use crate::ingest::waterml::{DecodeRequest, PayloadDecoder, WaterMlJsonDecoder};
use crate::locator;
use crate::logging;
use crate::model::{
    AcquisitionMode, ConfigurationError, DateRange, Interval, OutputFormat, Result, SiteStatus,
    TimeSeriesRecord,
};
use crate::variant::ServiceVariant;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Caller parameters
// ---------------------------------------------------------------------------

/// Caller-supplied acquisition parameters, unvalidated.
///
/// Parameter, statistic and site type lists may hold bare codes or
/// `"code - name"` strings. Empty lists mean no filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionParams {
    pub location: LocationInputs,
    /// Ignored in discovery mode.
    pub date_range: DateRange,
    pub parameter_codes: Vec<String>,
    /// Daily values only.
    pub statistic_codes: Vec<String>,
    pub site_status: SiteStatus,
    pub site_type_codes: Vec<String>,
    pub agency_code: Option<String>,
    /// `None` uses the configured default format.
    pub format: Option<OutputFormat>,
    /// Instantaneous values only; daily values accept only `Day`.
    pub interval_hint: Option<Interval>,
    /// When false, misaligned instantaneous timestamps are snapped to the
    /// nearest interval boundary instead of failing the call.
    pub require_interval_match: bool,
    /// Write the raw response body here (best effort).
    pub output_file: Option<PathBuf>,
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self {
            location: LocationInputs::default(),
            date_range: DateRange::unbounded(),
            parameter_codes: Vec::new(),
            statistic_codes: Vec::new(),
            site_status: SiteStatus::All,
            site_type_codes: Vec::new(),
            agency_code: None,
            format: None,
            interval_hint: None,
            require_interval_match: true,
            output_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct NwisClient {
    config: ClientConfig,
    variant: ServiceVariant,
    transport: Box<dyn HttpTransport>,
    decoder: Box<dyn PayloadDecoder>,
    codes: Arc<CodeTable>,
}

impl NwisClient {
    /// Production client: reqwest transport bounded by the configured
    /// timeout, WaterML JSON decoder and the built-in code table.
    pub fn new(config: ClientConfig, variant: ServiceVariant) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout(), &config.user_agent)?;
        let codes = CodeTable::builtin()?;
        Ok(Self::with_parts(
            config,
            variant,
            Box::new(transport),
            Box::new(WaterMlJsonDecoder),
            codes,
        ))
    }

    pub fn with_parts(
        config: ClientConfig,
        variant: ServiceVariant,
        transport: Box<dyn HttpTransport>,
        decoder: Box<dyn PayloadDecoder>,
        codes: Arc<CodeTable>,
    ) -> Self {
        Self {
            config,
            variant,
            transport,
            decoder,
            codes,
        }
    }

    pub fn variant(&self) -> ServiceVariant {
        self.variant
    }

    pub fn codes(&self) -> &CodeTable {
        &self.codes
    }

    /// Validates `params` into a request for `mode`.
    ///
    /// Location problems, service mismatches (a statistic filter or
    /// unsupported interval) and an inverted date range are all reported
    /// together. Discovery requests never carry dates, whatever was passed.
    pub fn build_request(
        &self,
        params: &AcquisitionParams,
        mode: AcquisitionMode,
    ) -> std::result::Result<FetchRequest, ConfigurationError> {
        let mut errors = ConfigurationError::new();

        let constraint = ConstraintSet::from_inputs(&params.location)
            .map_err(|e| errors.extend(e))
            .ok();

        let parameter_codes = self.codes.normalize(CodeKind::Parameter, &params.parameter_codes);
        let statistic_codes = self.codes.normalize(CodeKind::Statistic, &params.statistic_codes);
        let site_type_codes = self.codes.normalize(CodeKind::SiteType, &params.site_type_codes);

        if !statistic_codes.is_empty() && !self.variant.supports_statistics() {
            errors.push(
                "statCd",
                None,
                format!("statistic codes are not supported by the {} service", self.variant),
            );
        }

        let interval = self
            .variant
            .resolve_interval(params.interval_hint)
            .map_err(|e| errors.extend(e))
            .ok();

        let format = match params.format {
            Some(format) => Some(format),
            None => self.config.format().map_err(|e| errors.extend(e)).ok(),
        };

        let date_range = if mode.reads_data() {
            if let (Some(start), Some(end)) = (params.date_range.start, params.date_range.end) {
                if start > end {
                    errors.push("dateRange", None, format!("start {} is after end {}", start, end));
                }
            }
            params.date_range
        } else {
            DateRange::unbounded()
        };

        errors.into_result()?;

        match (constraint, interval, format) {
            (Some(constraint), Some(interval), Some(format)) => Ok(FetchRequest {
                variant: self.variant,
                mode,
                base_uri: self.config.base_url(self.variant).to_string(),
                constraint,
                date_range,
                parameter_codes,
                statistic_codes,
                site_status: params.site_status,
                site_type_codes,
                agency_code: params
                    .agency_code
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from),
                format,
                interval,
                require_interval_match: params.require_interval_match,
            }),
            // Each None has pushed a problem, so into_result returned above.
            _ => Err(ConfigurationError::single("request", "incomplete request")),
        }
    }

    /// Runs one acquisition: validate, fetch, decode.
    pub fn acquire(&self, params: &AcquisitionParams, mode: AcquisitionMode) -> Result<Vec<TimeSeriesRecord>> {
        let site = match params.location.sites.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        };

        self.acquire_inner(params, mode).inspect_err(|e| {
            logging::log_failure(self.variant.data_source(), site, "acquisition", e);
        })
    }

    fn acquire_inner(&self, params: &AcquisitionParams, mode: AcquisitionMode) -> Result<Vec<TimeSeriesRecord>> {
        let source = self.variant.data_source();
        let request = self.build_request(params, mode)?;
        let url = query::build_url(&request);

        logging::info(
            source,
            request.constraint.single_site(),
            &format!("{:?} request: {}", mode, url),
        );

        let body = fetch::fetch(self.transport.as_ref(), &url, params.output_file.as_deref(), source)?;

        let mut records = self.decoder.decode(&DecodeRequest {
            body: &body,
            variant: self.variant,
            interval: request.interval,
            read_window: request.date_range,
            read_data: mode.reads_data(),
            require_interval_match: request.require_interval_match,
        })?;

        for record in records.iter_mut().filter(|r| r.units.is_empty()) {
            if let Some(entry) = self.codes.parameter(&record.identifier.parameter_code) {
                record.units = entry.units.clone();
            }
        }

        logging::info(
            source,
            request.constraint.single_site(),
            &format!(
                "Decoded {} series ({} values)",
                records.len(),
                records.iter().map(|r| r.points.len()).sum::<usize>()
            ),
        );

        Ok(records)
    }

    /// Reads the one series named by a compact identifier.
    ///
    /// # Errors
    /// `NotFound` if the service returns no matching series, plus anything
    /// `acquire` can return.
    pub fn read_series(
        &self,
        identifier: &str,
        date_range: DateRange,
        mode: AcquisitionMode,
        output_file: Option<&Path>,
    ) -> Result<TimeSeriesRecord> {
        let id = locator::locate(identifier, self.variant)?;

        let mut params = locator::to_params(&id, date_range);
        params.output_file = output_file.map(Path::to_path_buf);

        let records = self.acquire(&params, mode)?;
        locator::select_single(&id, records).inspect_err(|e| {
            logging::log_failure(self.variant.data_source(), Some(&id.site_id), "series lookup", e);
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fetch::HttpResponse;
    use crate::ingest::fixtures::*;
    use crate::model::AcquisitionError;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Records requested URLs and answers with a fixed body.
    struct RecordingTransport {
        body: String,
        urls: Arc<Mutex<Vec<String>>>,
    }

    impl HttpTransport for RecordingTransport {
        fn get(&self, url: &str) -> Result<HttpResponse> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    fn client(variant: ServiceVariant, body: &str) -> (NwisClient, Arc<Mutex<Vec<String>>>) {
        let urls = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            body: body.to_string(),
            urls: Arc::clone(&urls),
        };
        let client = NwisClient::with_parts(
            ClientConfig::default(),
            variant,
            Box::new(transport),
            Box::new(WaterMlJsonDecoder),
            CodeTable::builtin().unwrap(),
        );
        (client, urls)
    }

    fn january_2020() -> DateRange {
        DateRange::from_dates(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        )
    }

    fn daily_params() -> AcquisitionParams {
        AcquisitionParams {
            location: LocationInputs::for_sites(&["09010500"]),
            date_range: january_2020(),
            parameter_codes: vec!["00060 - Discharge".to_string()],
            statistic_codes: vec!["00003".to_string()],
            format: Some(OutputFormat::WaterMl),
            ..AcquisitionParams::default()
        }
    }

    #[test]
    fn test_build_request_strips_composite_codes() {
        let (client, _) = client(ServiceVariant::Daily, "");
        let request = client.build_request(&daily_params(), AcquisitionMode::Run).unwrap();
        assert_eq!(
            query::build_query(&request),
            "sites=09010500&startDT=2020-01-01&endDT=2020-01-31&format=WaterML\
             &parameterCd=00060&statCd=00003&siteStatus=All"
        );
        assert_eq!(request.interval, Interval::Day);
    }

    #[test]
    fn test_discovery_request_has_no_dates() {
        let (client, _) = client(ServiceVariant::Daily, "");
        let request = client.build_request(&daily_params(), AcquisitionMode::Discovery).unwrap();
        assert!(request.date_range.is_unbounded());
        let query = query::build_query(&request);
        assert!(!query.contains("startDT") && !query.contains("endDT"), "got {}", query);
    }

    #[test]
    fn test_instantaneous_rejects_statistics_and_day_hint_together() {
        let (client, _) = client(ServiceVariant::Instantaneous, "");
        let params = AcquisitionParams {
            interval_hint: Some(Interval::Day),
            ..daily_params()
        };
        let err = client.build_request(&params, AcquisitionMode::Run).unwrap_err();
        assert!(err.mentions("statCd"));
        assert!(err.mentions("interval"));
    }

    #[test]
    fn test_inverted_range_only_matters_when_reading() {
        let (client, _) = client(ServiceVariant::Daily, "");
        let params = AcquisitionParams {
            date_range: DateRange::from_dates(
                NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            ),
            ..daily_params()
        };
        assert!(client.build_request(&params, AcquisitionMode::Run).unwrap_err().mentions("dateRange"));
        assert!(client.build_request(&params, AcquisitionMode::Discovery).is_ok());
    }

    #[test]
    fn test_empty_code_filters_mean_no_filter() {
        let (client, _) = client(ServiceVariant::Daily, "");
        let params = AcquisitionParams {
            location: LocationInputs::for_sites(&["09010500"]),
            ..AcquisitionParams::default()
        };
        let request = client.build_request(&params, AcquisitionMode::Run).unwrap();
        assert_eq!(query::build_query(&request), "sites=09010500&format=json&siteStatus=All");
    }

    #[test]
    fn test_run_returns_full_records() {
        let (client, urls) = client(ServiceVariant::Daily, fixture_daily_discharge_json());
        let records = client.acquire(&daily_params(), AcquisitionMode::Run).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].points.len(), 5);
        assert_eq!(urls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_discovery_returns_placeholders_and_sends_no_dates() {
        let (client, urls) = client(ServiceVariant::Daily, fixture_daily_discharge_json());
        let records = client.acquire(&daily_params(), AcquisitionMode::Discovery).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].points.is_empty());

        let urls = urls.lock().unwrap();
        assert!(!urls[0].contains("startDT"), "got {}", urls[0]);
    }

    #[test]
    fn test_missing_units_filled_from_code_table() {
        let body = fixture_daily_discharge_json().replace("\"unitCode\": \"ft3/s\"", "\"unitCode\": \"\"");
        let (client, _) = client(ServiceVariant::Daily, &body);
        let records = client.acquire(&daily_params(), AcquisitionMode::Discovery).unwrap();
        assert_eq!(records[0].units, "ft3/s");
    }

    #[test]
    fn test_read_series_round_trips_identifier() {
        let (client, urls) = client(ServiceVariant::Daily, fixture_daily_discharge_json());
        let record = client
            .read_series("09010500..00060-00003.Day", january_2020(), AcquisitionMode::Run, None)
            .unwrap();
        assert_eq!(record.identifier.to_string(), "09010500..00060-00003.Day");
        assert_eq!(
            urls.lock().unwrap()[0],
            "https://waterservices.usgs.gov/nwis/dv/?sites=09010500&startDT=2020-01-01&endDT=2020-01-31\
             &format=json&parameterCd=00060&statCd=00003&siteStatus=All"
        );
    }

    #[test]
    fn test_read_series_not_found() {
        let (client, _) = client(ServiceVariant::Daily, fixture_empty_json());
        let result = client.read_series("09010500..00060-00003.Day", january_2020(), AcquisitionMode::Run, None);
        assert!(matches!(result, Err(AcquisitionError::NotFound { .. })), "got {:?}", result);
    }

    #[test]
    fn test_instantaneous_misaligned_read_fails_whole_call() {
        let (client, _) = client(ServiceVariant::Instantaneous, fixture_misaligned_stage_json());
        let result = client.read_series("05568500..00065.15Min", DateRange::unbounded(), AcquisitionMode::Run, None);
        assert!(matches!(result, Err(AcquisitionError::DataShape { .. })), "got {:?}", result);
    }

    #[test]
    fn test_instantaneous_opt_in_snapping() {
        let (client, _) = client(ServiceVariant::Instantaneous, fixture_misaligned_stage_json());
        let params = AcquisitionParams {
            location: LocationInputs::for_sites(&["05568500"]),
            parameter_codes: vec!["00065".to_string()],
            interval_hint: Some(Interval::Minutes(15)),
            require_interval_match: false,
            ..AcquisitionParams::default()
        };
        let records = client.acquire(&params, AcquisitionMode::Run).unwrap();
        assert_eq!(records[0].points[1].timestamp.to_rfc3339(), "2024-05-01T12:15:00-05:00");
    }
}

//! Representative NWIS JSON payloads for unit tests.
//!
//! The payloads live under `tests/fixtures/` so the integration tests can
//! share them.

/// Daily mean discharge for 09010500, 2020-01-01..05. The third day carries
/// the no-data sentinel.
pub fn fixture_daily_discharge_json() -> &'static str {
    include_str!("../../tests/fixtures/dv_09010500_discharge.json")
}

/// 15-minute discharge and stage for Kingston Mines, all on boundaries.
pub fn fixture_instantaneous_json() -> &'static str {
    include_str!("../../tests/fixtures/iv_05568500_stage_discharge.json")
}

/// 15-minute stage for Kingston Mines with one reading at 12:22.
pub fn fixture_misaligned_stage_json() -> &'static str {
    include_str!("../../tests/fixtures/iv_05568500_stage_misaligned.json")
}

/// A well-formed response with no series.
pub fn fixture_empty_json() -> &'static str {
    include_str!("../../tests/fixtures/empty_time_series.json")
}

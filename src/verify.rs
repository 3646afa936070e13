//! Catalog verification.
//!
//! Checks a list of compact identifiers against the live service with one
//! discovery lookup each, so a configuration can be validated before it is
//! used for bulk reads. No values are downloaded.

use crate::logging;
use crate::model::{AcquisitionError, AcquisitionMode, DateRange};
use crate::service::NwisClient;
use chrono::Utc;
use serde::Serialize;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub service: String,
    pub results: Vec<SeriesVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub found: usize,
    pub missing: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesVerification {
    pub identifier: String,
    pub status: VerificationStatus,
    pub site_name: Option<String>,
    pub units: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Found,
    Missing,
    Failed,
}

// ============================================================================
// Verification
// ============================================================================

/// Looks up one identifier. Never fails; problems land in the result.
pub fn verify_one(client: &NwisClient, identifier: &str) -> SeriesVerification {
    let mut result = SeriesVerification {
        identifier: identifier.to_string(),
        status: VerificationStatus::Failed,
        site_name: None,
        units: None,
        error_message: None,
    };

    match client.read_series(identifier, DateRange::unbounded(), AcquisitionMode::Discovery, None) {
        Ok(record) => {
            result.status = VerificationStatus::Found;
            result.site_name = Some(record.site_name);
            result.units = Some(record.units);
        }
        Err(AcquisitionError::NotFound { .. }) => {
            result.status = VerificationStatus::Missing;
        }
        Err(e) => {
            result.error_message = Some(e.to_string());
        }
    }

    result
}

/// Verifies every identifier in order. One lookup failing does not stop
/// the others.
pub fn verify_series<S: AsRef<str>>(client: &NwisClient, identifiers: &[S]) -> VerificationReport {
    let mut summary = VerificationSummary {
        total: identifiers.len(),
        ..VerificationSummary::default()
    };

    let results: Vec<SeriesVerification> = identifiers
        .iter()
        .map(|id| verify_one(client, id.as_ref()))
        .inspect(|r| match r.status {
            VerificationStatus::Found => summary.found += 1,
            VerificationStatus::Missing => summary.missing += 1,
            VerificationStatus::Failed => summary.failed += 1,
        })
        .collect();

    logging::log_batch_summary(
        client.variant().data_source(),
        summary.total,
        summary.found,
        summary.missing + summary.failed,
    );

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        service: client.variant().to_string(),
        results,
        summary,
    }
}

/// Human-readable summary on stderr, leaving stdout for the JSON report.
pub fn print_summary(report: &VerificationReport) {
    eprintln!("Verification of {} series ({})", report.summary.total, report.service);
    for r in &report.results {
        match r.status {
            VerificationStatus::Found => eprintln!(
                "  {:<32} OK       {} [{}]",
                r.identifier,
                r.site_name.as_deref().unwrap_or(""),
                r.units.as_deref().unwrap_or("")
            ),
            VerificationStatus::Missing => eprintln!("  {:<32} MISSING", r.identifier),
            VerificationStatus::Failed => eprintln!(
                "  {:<32} FAILED   {}",
                r.identifier,
                r.error_message.as_deref().unwrap_or("Unknown")
            ),
        }
    }
    eprintln!(
        "{}/{} found, {} missing, {} failed",
        report.summary.found, report.summary.total, report.summary.missing, report.summary.failed
    );
}

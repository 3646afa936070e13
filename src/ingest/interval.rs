//! Interval reconciliation for decoded instantaneous values.
//!
//! WaterML does not declare a sampling interval, so the interval comes from
//! the caller. With `require_match` every timestamp must sit exactly on an
//! interval boundary and the first one that does not fails the series.
//! Without it, misaligned timestamps are moved to the nearest boundary.
//! That coercion is lossy and only happens when the caller opts in.
//! Irregular and daily series are returned untouched.
//!
//! Boundaries are counted from the Unix epoch on the timestamp's local wall
//! clock, so `12:15-05:00` is on a 15-minute boundary.

use crate::logging::{self, DataSource};
use crate::model::{AcquisitionError, DataPoint, Interval, Result};

/// Checks or coerces `points` against `interval`.
///
/// `series` names the series in errors and log messages. Points are
/// expected in ascending time order. When snapping lands two points on
/// the same boundary, the first is kept.
pub fn reconcile(
    series: &str,
    points: Vec<DataPoint>,
    interval: Interval,
    require_match: bool,
    source: DataSource,
) -> Result<Vec<DataPoint>> {
    let Some(step) = interval.step_seconds() else {
        return Ok(points);
    };

    let mut out: Vec<DataPoint> = Vec::with_capacity(points.len());
    let mut snapped = 0usize;
    let mut dropped = 0usize;

    for mut point in points {
        let wall_clock = point.timestamp.naive_local().and_utc().timestamp();
        let offset = wall_clock.rem_euclid(step);

        if offset != 0 {
            if require_match {
                return Err(AcquisitionError::DataShape {
                    series: series.to_string(),
                    timestamp: point.timestamp.to_rfc3339(),
                    interval,
                });
            }
            let shift = if offset * 2 >= step { step - offset } else { -offset };
            point.timestamp += chrono::Duration::seconds(shift);
            snapped += 1;
        }

        if out.last().is_some_and(|prev| prev.timestamp == point.timestamp) {
            dropped += 1;
            continue;
        }
        out.push(point);
    }

    if snapped > 0 {
        logging::debug(
            source,
            None,
            &format!("{}: moved {} timestamps onto {} boundaries", series, snapped, interval),
        );
    }
    if dropped > 0 {
        logging::warn(
            source,
            None,
            &format!("{}: dropped {} values that snapped onto an occupied boundary", series, dropped),
        );
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

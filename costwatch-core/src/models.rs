//! Domain models for cost reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Error message for a malformed named-month request.
pub const MONTH_FORMAT_ERROR: &str = "Month must be in YYYY-MM format";

/// Default time-series bucketing granularity.
pub const DEFAULT_RESOLUTION: &str = "day";

// ============================================================================
// Cost Point
// ============================================================================

/// A single dated cost sample.
///
/// The timestamp is carried verbatim from the billing payload as an ISO-8601
/// UTC string; a series is sorted ascending by this string, which is
/// chronological ordering for same-format UTC timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    /// ISO-8601 UTC timestamp of the bucket start.
    pub timestamp: String,
    /// Cost for the bucket, in the configured currency.
    pub cost: f64,
}

// ============================================================================
// Cost Report
// ============================================================================

/// The engine's sole success output: one aggregate plus an ordered series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostReport {
    /// The project the report covers.
    pub project_id: String,
    /// Aggregate cost over the resolved window.
    pub aggregate_cost: f64,
    /// Currency label, passed through from configuration.
    pub currency: String,
    /// Dated cost points, sorted ascending by timestamp.
    pub time_series: Vec<CostPoint>,
    /// Resolved window start, ISO-8601 UTC.
    pub start: String,
    /// Resolved window end, ISO-8601 UTC.
    pub end: String,
    /// Bucketing granularity the series was fetched with.
    pub resolution: String,
}

// ============================================================================
// Range Request
// ============================================================================

/// A logical time-range request, before calendar resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeRequest {
    /// Explicit start/end bounds.
    Explicit {
        /// Window start.
        start: DateTime<Utc>,
        /// Window end.
        end: DateTime<Utc>,
        /// Series granularity.
        resolution: String,
    },
    /// A specific calendar month.
    NamedMonth {
        /// Calendar year.
        year: i32,
        /// Calendar month, 1-12.
        month: u32,
        /// Series granularity.
        resolution: String,
    },
    /// The calendar month preceding the current one.
    LastMonth {
        /// Series granularity.
        resolution: String,
    },
    /// Month-resolution rollup from the Unix epoch up to the end of the last
    /// completed month.
    CumulativeMonthly,
}

impl RangeRequest {
    /// Builds a [`RangeRequest::NamedMonth`] from a `YYYY-MM` string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRange`] with [`MONTH_FORMAT_ERROR`] for
    /// anything that is not a four-digit year, a dash, and a month in 1-12.
    pub fn named_month(raw: &str, resolution: impl Into<String>) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidRange(MONTH_FORMAT_ERROR.to_string());

        let (year_part, month_part) = raw.split_once('-').ok_or_else(invalid)?;
        if year_part.len() != 4 || month_part.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self::NamedMonth {
            year,
            month,
            resolution: resolution.into(),
        })
    }
}

// ============================================================================
// Resolved Range
// ============================================================================

/// Concrete UTC bounds produced from a [`RangeRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRange {
    /// Window start, inclusive.
    pub start: DateTime<Utc>,
    /// Window end, inclusive (last second of the window).
    pub end: DateTime<Utc>,
    /// Series granularity to forward upstream.
    pub resolution: String,
}

// ============================================================================
// Tests
// ============================================================================

//! Calendar window arithmetic.
//!
//! Pure UTC date-boundary functions: the trailing default window, explicit
//! month bounds, the previous calendar month, and the cumulative rollup
//! window since the Unix epoch. Month-bounded windows end on the last second
//! of the month (23:59:59), never midnight of the next month, so that
//! inclusive-range billing queries do not spill into the following period.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};

use crate::error::{EngineError, Result};
use crate::models::{RangeRequest, ResolvedRange};

/// Length of the default trailing window.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Series granularity used for the cumulative monthly rollup.
const MONTH_RESOLUTION: &str = "month";

/// Naive datetime formats accepted from callers. A string without an offset
/// is interpreted as UTC, not local time; this is a strict contract.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// ============================================================================
// Window Calculations
// ============================================================================

/// Returns the default trailing window: the 30 days up to `now`.
pub fn default_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(DEFAULT_WINDOW_DAYS), now)
}

/// Returns the first instant and last second of the given calendar month.
///
/// The end is computed by taking the first instant of the following month and
/// subtracting one second, which handles month lengths and leap years without
/// a day table. December rolls over into January of the next year.
///
/// # Errors
///
/// Returns [`EngineError::InvalidRange`] when the month is outside 1-12 or
/// the year is not representable.
pub fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || EngineError::InvalidRange(format!("invalid month {year}-{month:02}"));

    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let next_start = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;

    Ok((start, next_start - Duration::seconds(1)))
}

/// Returns the bounds of the calendar month preceding `now`'s UTC month.
pub fn previous_month_bounds(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (year, month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    month_bounds(year, month)
}

/// Returns the first instant of `now`'s UTC month.
pub fn start_of_current_month(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .ok_or_else(|| EngineError::InvalidRange(format!("invalid current month for {now}")))
}

/// Returns the cumulative rollup window: `epoch` up to one second before the
/// start of the current UTC month.
pub fn cumulative_monthly_window(
    now: DateTime<Utc>,
    epoch: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((epoch, start_of_current_month(now)? - Duration::seconds(1)))
}

/// Resolves a [`RangeRequest`] to concrete UTC bounds.
///
/// # Errors
///
/// Returns [`EngineError::InvalidRange`] for an inverted explicit range or an
/// unrepresentable month.
pub fn resolve(request: &RangeRequest, now: DateTime<Utc>) -> Result<ResolvedRange> {
    match request {
        RangeRequest::Explicit { start, end, resolution } => {
            if start > end {
                return Err(EngineError::InvalidRange(
                    "start must not be after end".to_string(),
                ));
            }
            Ok(ResolvedRange {
                start: *start,
                end: *end,
                resolution: resolution.clone(),
            })
        }
        RangeRequest::NamedMonth { year, month, resolution } => {
            let (start, end) = month_bounds(*year, *month)?;
            Ok(ResolvedRange {
                start,
                end,
                resolution: resolution.clone(),
            })
        }
        RangeRequest::LastMonth { resolution } => {
            let (start, end) = previous_month_bounds(now)?;
            Ok(ResolvedRange {
                start,
                end,
                resolution: resolution.clone(),
            })
        }
        RangeRequest::CumulativeMonthly => {
            let (start, end) = cumulative_monthly_window(now, DateTime::<Utc>::UNIX_EPOCH)?;
            Ok(ResolvedRange {
                start,
                end,
                resolution: MONTH_RESOLUTION.to_string(),
            })
        }
    }
}

// ============================================================================
// Parsing & Formatting
// ============================================================================

/// Parses a caller-supplied ISO-8601 datetime.
///
/// Accepts an explicit offset, a trailing `Z`, or a naive string; a naive
/// string is interpreted as UTC. Fractional seconds are accepted and
/// truncated to whole seconds.
///
/// # Errors
///
/// Returns [`EngineError::InvalidRange`] when no accepted format matches.
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc).trunc_subsecs(0));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed.and_utc().trunc_subsecs(0));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(EngineError::InvalidRange(format!("invalid date '{raw}'")))
}

/// Formats an instant for serialization and upstream query parameters:
/// whole seconds with an explicit `+00:00` offset.
pub fn format_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

// ============================================================================
// Tests
// ============================================================================

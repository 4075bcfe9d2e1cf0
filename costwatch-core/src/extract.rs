//! Recursive cost extraction over arbitrary billing payloads.
//!
//! The billing service's summary responses vary by deployment and API
//! version, so nothing here deserializes into a fixed shape. Instead two
//! independent walks visit the whole [`serde_json::Value`] tree: one sums
//! every value found under a recognized cost-bearing key, the other collects
//! dated cost points from nodes that pair a date field with a cost field.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::models::CostPoint;

/// Keys whose values count toward the aggregate, matched case-insensitively.
const COST_KEYS: [&str; 5] = ["cost", "total", "price", "rated_cost", "rate"];

/// Recognized (date key, cost key) pairings for series extraction.
const SERIES_PAIRINGS: [(&str, &str); 3] = [
    ("begin", "cost"),
    ("begin", "rate"),
    ("period_begin", "rated_cost"),
];

// ============================================================================
// Sum Walk
// ============================================================================

/// Sums every numeric value found under a recognized cost key, at any depth.
///
/// Accumulation is exact decimal arithmetic; conversion to floating point is
/// left to the output boundary. A value under a cost key that does not parse
/// as a number is skipped silently and the walk recurses into it instead, in
/// case it is itself a nested structure.
pub fn sum_costs(node: &Value) -> Decimal {
    let mut total = Decimal::ZERO;
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                if COST_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                    if let Some(amount) = decimal_value(value) {
                        total += amount;
                        continue;
                    }
                }
                total += sum_costs(value);
            }
        }
        Value::Array(items) => {
            for item in items {
                total += sum_costs(item);
            }
        }
        _ => {}
    }
    total
}

// ============================================================================
// Series Walk
// ============================================================================

/// Collects every `(timestamp, cost)` point matching a recognized pairing.
///
/// A node emits one point per pairing it satisfies, so a node matching
/// several pairings emits several points. The walk recurses into all children
/// regardless of whether the current node emitted. The output is
/// stable-sorted ascending by timestamp string; equal timestamps are kept as
/// distinct points in pre-sort order.
pub fn extract_series(payload: &Value) -> Vec<CostPoint> {
    let mut series = Vec::new();
    visit(payload, &mut series);
    series.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    series
}

fn visit(node: &Value, series: &mut Vec<CostPoint>) {
    match node {
        Value::Object(map) => {
            for (date_key, cost_key) in SERIES_PAIRINGS {
                let Some(Value::String(timestamp)) = map.get(date_key) else {
                    continue;
                };
                let Some(cost) = map.get(cost_key).and_then(float_value) else {
                    continue;
                };
                series.push(CostPoint {
                    timestamp: timestamp.clone(),
                    cost,
                });
            }
            for value in map.values() {
                visit(value, series);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, series);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Value Parsing
// ============================================================================

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

fn float_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

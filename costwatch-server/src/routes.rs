//! HTTP routes for the cost API.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use costwatch_client::CostEngine;
use costwatch_core::models::{CostReport, DEFAULT_RESOLUTION, RangeRequest};
use costwatch_core::{EngineError, calendar};

use crate::error::ApiFailure;

/// Shared application state.
pub struct AppState {
    /// The cost engine, shared across all requests.
    pub engine: CostEngine,
}

/// Builds the API router.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/projects/{project_id}/costs", get(project_costs))
        .route("/api/projects/{project_id}/costs/{range}", get(project_costs_range))
        .with_state(state)
}

// ============================================================================
// Query Options
// ============================================================================

/// Query options shared by all cost endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct CostsQuery {
    start: Option<String>,
    end: Option<String>,
    resolution: Option<String>,
    include_series: Option<String>,
}

impl CostsQuery {
    fn resolution(&self) -> String {
        self.resolution
            .clone()
            .unwrap_or_else(|| DEFAULT_RESOLUTION.to_string())
    }

    /// Series inclusion defaults to true; only an explicit `false` disables.
    fn include_series(&self) -> bool {
        !self
            .include_series
            .as_deref()
            .is_some_and(|value| value.eq_ignore_ascii_case("false"))
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Explicit or default trailing window.
async fn project_costs(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(query): Query<CostsQuery>,
) -> Result<Json<CostReport>, ApiFailure> {
    let now = Utc::now();
    let (default_start, default_end) = calendar::default_window(now);
    let start = match &query.start {
        Some(raw) => calendar::parse_datetime(raw)?,
        None => default_start,
    };
    let end = match &query.end {
        Some(raw) => calendar::parse_datetime(raw)?,
        None => default_end,
    };

    let request = RangeRequest::Explicit {
        start,
        end,
        resolution: query.resolution(),
    };
    debug!(project_id = %project_id, ?request, "Explicit cost request");
    let report = state
        .engine
        .resolve(&project_id, &request, query.include_series())
        .await?;
    Ok(Json(report))
}

/// Named range: `last-month`, `monthly`, or a `YYYY-MM` month.
async fn project_costs_range(
    State(state): State<Arc<AppState>>,
    Path((project_id, range)): Path<(String, String)>,
    Query(query): Query<CostsQuery>,
) -> Result<Json<CostReport>, ApiFailure> {
    let request = parse_range(&range, &query)?;
    debug!(project_id = %project_id, ?request, "Named-range cost request");
    let report = state
        .engine
        .resolve(&project_id, &request, query.include_series())
        .await?;
    Ok(Json(report))
}

fn parse_range(range: &str, query: &CostsQuery) -> Result<RangeRequest, EngineError> {
    match range {
        "last-month" => Ok(RangeRequest::LastMonth {
            resolution: query.resolution(),
        }),
        "monthly" => Ok(RangeRequest::CumulativeMonthly),
        raw => RangeRequest::named_month(raw, query.resolution()),
    }
}

// ============================================================================
// Tests
// ============================================================================

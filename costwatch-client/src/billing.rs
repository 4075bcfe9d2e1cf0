//! Billing summary queries with an endpoint-shape fallback chain.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use costwatch_core::calendar::format_utc;
use costwatch_core::error::{EngineError, Result};
use costwatch_core::extract::{extract_series, sum_costs};
use costwatch_core::models::CostPoint;

use crate::http::{AUTH_TOKEN_HEADER, api_error, transport_error};
use crate::session::IdentitySession;

// ============================================================================
// Summary Candidates
// ============================================================================

/// One known billing summary endpoint shape: resource path plus the query
/// parameter name that carries the project id.
#[derive(Debug, Clone, Copy)]
pub struct SummaryCandidate {
    /// Resource path relative to the billing endpoint.
    pub path: &'static str,
    /// Query parameter naming for the project id.
    pub project_param: &'static str,
}

/// Candidate shapes tried in order, canonical first. The chain is a fallback
/// across deployments and API versions, not a retry loop: each candidate is
/// attempted at most once per query.
pub const SUMMARY_CANDIDATES: &[SummaryCandidate] = &[
    SummaryCandidate { path: "/v1/report/summary", project_param: "tenant_id" },
    SummaryCandidate { path: "/v1/report/summary", project_param: "project_id" },
    SummaryCandidate { path: "/v2/summary", project_param: "project_id" },
];

// ============================================================================
// Billing Client
// ============================================================================

/// Authenticated client for the billing summary resource.
pub struct BillingClient {
    session: Arc<IdentitySession>,
    http: reqwest::Client,
}

impl BillingClient {
    /// Creates a client sharing the session's HTTP client.
    pub fn new(session: Arc<IdentitySession>, http: reqwest::Client) -> Self {
        Self { session, http }
    }

    /// Fetches the aggregate cost for a project over the given window.
    ///
    /// Probes the candidate chain; the first candidate whose payload sums to
    /// a non-zero total wins. When every candidate succeeds but yields
    /// nothing, the aggregate is zero.
    ///
    /// # Errors
    ///
    /// [`EngineError::BillingQuery`] when all candidates fail.
    #[instrument(skip(self))]
    pub async fn fetch_aggregate(
        &self,
        project_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Decimal> {
        let mut empty_fallback = None;

        for candidate in SUMMARY_CANDIDATES {
            match self.query_summary(candidate, project_id, start, end, None).await {
                Ok(payload) => {
                    let total = sum_costs(&payload);
                    if !total.is_zero() {
                        debug!(path = candidate.path, %total, "Aggregate candidate succeeded");
                        return Ok(total);
                    }
                    empty_fallback.get_or_insert(total);
                }
                Err(error) => warn!(
                    path = candidate.path,
                    param = candidate.project_param,
                    error = %error,
                    "Aggregate candidate failed"
                ),
            }
        }

        empty_fallback.ok_or_else(|| {
            EngineError::BillingQuery(format!(
                "unable to compute aggregate for project '{project_id}'"
            ))
        })
    }

    /// Fetches the grouped time series for a project over the given window.
    ///
    /// Probes the candidate chain; the first candidate yielding a non-empty
    /// series wins. When every candidate succeeds but yields nothing, the
    /// series is empty.
    ///
    /// # Errors
    ///
    /// [`EngineError::BillingQuery`] when all candidates fail.
    #[instrument(skip(self))]
    pub async fn fetch_series(
        &self,
        project_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: &str,
    ) -> Result<Vec<CostPoint>> {
        let mut empty_fallback = None;

        for candidate in SUMMARY_CANDIDATES {
            match self
                .query_summary(candidate, project_id, start, end, Some(resolution))
                .await
            {
                Ok(payload) => {
                    let series = extract_series(&payload);
                    if !series.is_empty() {
                        debug!(
                            path = candidate.path,
                            points = series.len(),
                            "Series candidate succeeded"
                        );
                        return Ok(series);
                    }
                    empty_fallback.get_or_insert(series);
                }
                Err(error) => warn!(
                    path = candidate.path,
                    param = candidate.project_param,
                    error = %error,
                    "Series candidate failed"
                ),
            }
        }

        empty_fallback.ok_or_else(|| {
            EngineError::BillingQuery(format!(
                "unable to fetch time series for project '{project_id}'"
            ))
        })
    }

    /// Issues one authenticated summary query against one candidate shape.
    async fn query_summary(
        &self,
        candidate: &SummaryCandidate,
        project_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution: Option<&str>,
    ) -> Result<Value> {
        let state = self.session.state().await?;
        let url = format!("{}{}", state.endpoint, candidate.path);

        let mut params = vec![
            (candidate.project_param, project_id.to_string()),
            ("begin", format_utc(start)),
            ("end", format_utc(end)),
        ];
        if let Some(resolution) = resolution {
            params.push(("groupby", resolution.to_string()));
        }

        debug!(url = %url, param = candidate.project_param, "Billing summary query");
        let response = self
            .http
            .get(&url)
            .query(&params)
            .header(AUTH_TOKEN_HEADER, &state.token)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        if !response.status().is_success() {
            return Err(api_error(&url, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| EngineError::Transport(format!("unreadable payload from {url}: {e}")))
    }
}

impl std::fmt::Debug for BillingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingClient").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

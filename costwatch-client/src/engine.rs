//! Range resolution facade: the single entry point for the HTTP layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, instrument};

use costwatch_core::calendar;
use costwatch_core::error::Result;
use costwatch_core::models::{CostPoint, CostReport, RangeRequest, ResolvedRange};

use crate::billing::BillingClient;
use crate::config::Credentials;
use crate::http::build_client;
use crate::session::IdentitySession;

/// The cost aggregation engine.
///
/// One instance is shared across all inbound requests; each `resolve` call
/// performs a strictly ordered sequence of upstream calls with no internal
/// parallelism, and is safe for concurrent invocation over the shared
/// identity session.
pub struct CostEngine {
    session: Arc<IdentitySession>,
    billing: BillingClient,
    currency: String,
}

impl CostEngine {
    /// Builds the engine from loaded credentials.
    ///
    /// # Errors
    ///
    /// [`costwatch_core::EngineError::Configuration`] when the HTTP client
    /// cannot be constructed.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = build_client(credentials.verify_tls)?;
        let currency = credentials.currency.clone();
        let session = Arc::new(IdentitySession::new(credentials, http.clone()));
        let billing = BillingClient::new(Arc::clone(&session), http);
        Ok(Self {
            session,
            billing,
            currency,
        })
    }

    /// Resolves a range request into a cost report.
    ///
    /// Steps, short-circuiting on the first failure: resolve calendar
    /// bounds, verify the project exists, fetch the aggregate, fetch the
    /// series when requested.
    ///
    /// # Errors
    ///
    /// See `costwatch_core::EngineError`; a missing project returns
    /// `ProjectNotFound` without touching the billing service.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        project_id: &str,
        request: &RangeRequest,
        include_series: bool,
    ) -> Result<CostReport> {
        let now = Utc::now();
        let range = calendar::resolve(request, now)?;

        self.session.ensure_project_exists(project_id).await?;

        if matches!(request, RangeRequest::CumulativeMonthly) {
            return self
                .cumulative_monthly(project_id, &range, now, include_series)
                .await;
        }

        let aggregate = self
            .billing
            .fetch_aggregate(project_id, range.start, range.end)
            .await?;
        let series = if include_series {
            self.billing
                .fetch_series(project_id, range.start, range.end, &range.resolution)
                .await?
        } else {
            Vec::new()
        };

        Ok(self.report(project_id, aggregate, series, &range))
    }

    /// Cumulative rollup: one month-resolution series over the whole epoch
    /// window, filtered to completed months.
    ///
    /// The upstream service may return a partial bucket for the in-progress
    /// month; points not strictly before the start of the current UTC month
    /// are dropped, and the aggregate is recomputed as the exact sum of the
    /// remaining points so the total always equals the displayed series.
    async fn cumulative_monthly(
        &self,
        project_id: &str,
        range: &ResolvedRange,
        now: DateTime<Utc>,
        include_series: bool,
    ) -> Result<CostReport> {
        let series = self
            .billing
            .fetch_series(project_id, range.start, range.end, &range.resolution)
            .await?;

        let month_start = calendar::start_of_current_month(now)?;
        let completed: Vec<CostPoint> = series
            .into_iter()
            .filter(|point| {
                calendar::parse_datetime(&point.timestamp)
                    .map(|instant| instant < month_start)
                    .unwrap_or(false)
            })
            .collect();

        let aggregate: Decimal = completed
            .iter()
            .map(|point| Decimal::from_f64_retain(point.cost).unwrap_or(Decimal::ZERO))
            .sum();
        debug!(points = completed.len(), %aggregate, "Cumulative monthly rollup");

        let series = if include_series { completed } else { Vec::new() };
        Ok(self.report(project_id, aggregate, series, range))
    }

    fn report(
        &self,
        project_id: &str,
        aggregate: Decimal,
        series: Vec<CostPoint>,
        range: &ResolvedRange,
    ) -> CostReport {
        CostReport {
            project_id: project_id.to_string(),
            aggregate_cost: aggregate.to_f64().unwrap_or_default(),
            currency: self.currency.clone(),
            time_series: series,
            start: calendar::format_utc(range.start),
            end: calendar::format_utc(range.end),
            resolution: range.resolution.clone(),
        }
    }
}

impl std::fmt::Debug for CostEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostEngine")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

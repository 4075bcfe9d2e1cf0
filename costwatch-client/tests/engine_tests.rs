//! End-to-end engine tests against a mocked identity + billing upstream.

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use costwatch_client::{CostEngine, Credentials, ProjectScope};
use costwatch_core::{EngineError, RangeRequest, calendar};

fn credentials(server: &MockServer) -> Credentials {
    Credentials {
        auth_url: format!("{}/v3", server.uri()),
        token_url: format!("{}/v3/auth/tokens", server.uri()),
        username: "user".to_string(),
        password: "secret".to_string(),
        user_domain: "Default".to_string(),
        project_scope: ProjectScope::Id("proj".to_string()),
        region: None,
        interface: "public".to_string(),
        verify_tls: true,
        billing_endpoint: None,
        currency: "EUR".to_string(),
    }
}

fn catalog_body(server: &MockServer) -> serde_json::Value {
    json!({
        "token": {
            "catalog": [
                {"type": "rating", "endpoints": [
                    {"interface": "public", "region": "R1", "url": server.uri()}
                ]}
            ]
        }
    })
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Subject-Token", "tok-123")
                .set_body_json(catalog_body(server)),
        )
        .mount(server)
        .await;
}

async fn mount_project_lookup(server: &MockServer, project_id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/v3/projects/{project_id}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
        .mount(server)
        .await;
}

fn explicit_last_day() -> RangeRequest {
    let now = Utc::now();
    RangeRequest::Explicit {
        start: now - Duration::days(1),
        end: now,
        resolution: "day".to_string(),
    }
}

#[tokio::test]
async fn test_report_from_summary_payload() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_project_lookup(&server, "proj-1", 200).await;

    Mock::given(method("GET"))
        .and(path("/v1/report/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": [
                {"begin": "2026-02-20T10:18:41", "rate": "0.02"},
                {"begin": "2026-02-21T10:18:41", "rate": "0.03"}
            ]
        })))
        .mount(&server)
        .await;

    let engine = CostEngine::new(credentials(&server)).unwrap();
    let report = engine
        .resolve("proj-1", &explicit_last_day(), true)
        .await
        .unwrap();

    assert_eq!(report.project_id, "proj-1");
    assert_eq!(report.aggregate_cost, 0.05);
    assert_eq!(report.currency, "EUR");
    assert_eq!(report.time_series.len(), 2);
    assert_eq!(report.time_series[0].timestamp, "2026-02-20T10:18:41");
    assert_eq!(report.time_series[0].cost, 0.02);
    assert_eq!(report.resolution, "day");
}

#[tokio::test]
async fn test_series_excluded_when_not_requested() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_project_lookup(&server, "proj-1", 200).await;

    Mock::given(method("GET"))
        .and(path("/v1/report/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": [{"begin": "2026-02-20T10:18:41", "rate": "0.02"}]
        })))
        .mount(&server)
        .await;

    let engine = CostEngine::new(credentials(&server)).unwrap();
    let report = engine
        .resolve("proj-1", &explicit_last_day(), false)
        .await
        .unwrap();

    assert_eq!(report.aggregate_cost, 0.02);
    assert!(report.time_series.is_empty());
}

#[tokio::test]
async fn test_missing_subject_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(catalog_body(&server)))
        .mount(&server)
        .await;

    let engine = CostEngine::new(credentials(&server)).unwrap();
    let err = engine
        .resolve("proj-1", &explicit_last_day(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Authentication(_)));
    assert!(err.to_string().contains("no subject token"));
}

#[tokio::test]
async fn test_unreachable_identity_is_auth_error() {
    // Nothing listens on port 1; the token POST fails at the transport
    // level, which the session must report as an authentication failure.
    let creds = Credentials {
        auth_url: "http://127.0.0.1:1/v3".to_string(),
        token_url: "http://127.0.0.1:1/v3/auth/tokens".to_string(),
        username: "user".to_string(),
        password: "secret".to_string(),
        user_domain: "Default".to_string(),
        project_scope: ProjectScope::Id("proj".to_string()),
        region: None,
        interface: "public".to_string(),
        verify_tls: true,
        billing_endpoint: None,
        currency: "EUR".to_string(),
    };

    let engine = CostEngine::new(creds).unwrap();
    let err = engine
        .resolve("proj-1", &explicit_last_day(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Authentication(_)));
    assert!(err.to_string().contains("127.0.0.1:1"));
}

#[tokio::test]
async fn test_missing_project_skips_billing() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_project_lookup(&server, "missing-project", 404).await;

    // The billing service must not be touched for an unknown project.
    Mock::given(method("GET"))
        .and(path("/v1/report/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let engine = CostEngine::new(credentials(&server)).unwrap();
    let err = engine
        .resolve("missing-project", &explicit_last_day(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ProjectNotFound(_)));
    assert_eq!(err.to_string(), "Project 'missing-project' does not exist");
}

#[tokio::test]
async fn test_fallback_to_next_candidate() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_project_lookup(&server, "proj-1", 200).await;

    // Canonical shape rejects the query; the second shape answers.
    Mock::given(method("GET"))
        .and(path("/v1/report/summary"))
        .and(query_param("tenant_id", "proj-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/report/summary"))
        .and(query_param("project_id", "proj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": [{"begin": "2026-02-20T00:00:00", "cost": "1.25"}]
        })))
        .mount(&server)
        .await;

    let engine = CostEngine::new(credentials(&server)).unwrap();
    let report = engine
        .resolve("proj-1", &explicit_last_day(), true)
        .await
        .unwrap();

    assert_eq!(report.aggregate_cost, 1.25);
    assert_eq!(report.time_series.len(), 1);
}

#[tokio::test]
async fn test_all_candidates_failing_is_billing_query_error() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_project_lookup(&server, "proj-1", 200).await;

    for failing_path in ["/v1/report/summary", "/v2/summary"] {
        Mock::given(method("GET"))
            .and(path(failing_path))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;
    }

    let engine = CostEngine::new(credentials(&server)).unwrap();
    let err = engine
        .resolve("proj-1", &explicit_last_day(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::BillingQuery(_)));
    assert!(err.to_string().contains("unable to compute aggregate"));
}

#[tokio::test]
async fn test_cumulative_monthly_drops_current_month_bucket() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_project_lookup(&server, "proj-1", 200).await;

    let now = Utc::now();
    let current_month_start = calendar::start_of_current_month(now).unwrap();
    let (previous_month_start, _) = calendar::previous_month_bounds(now).unwrap();
    let fmt = |t: chrono::DateTime<Utc>| t.format("%Y-%m-%dT%H:%M:%S").to_string();

    Mock::given(method("GET"))
        .and(path("/v1/report/summary"))
        .and(query_param("groupby", "month"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": [
                {"begin": fmt(previous_month_start), "rate": "5.0"},
                {"begin": fmt(current_month_start), "rate": "9.0"}
            ]
        })))
        .mount(&server)
        .await;

    let engine = CostEngine::new(credentials(&server)).unwrap();
    let report = engine
        .resolve("proj-1", &RangeRequest::CumulativeMonthly, true)
        .await
        .unwrap();

    // The in-progress month is filtered out and the aggregate equals the
    // sum of the completed months, not any upstream aggregate.
    assert_eq!(report.aggregate_cost, 5.0);
    assert_eq!(report.time_series.len(), 1);
    assert_eq!(report.time_series[0].timestamp, fmt(previous_month_start));
    assert_eq!(report.resolution, "month");
    assert_eq!(report.start, "1970-01-01T00:00:00+00:00");
}

//! Idempotent default pricing setup on the rating service's hashmap module.
//!
//! A fresh rating deployment prices nothing until a hashmap configuration
//! exists. The configurator ensures a baseline set of per-flavor prices:
//! each service, its `flavor` field, and each value mapping is looked up
//! first and created only when absent, so re-running is safe.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use costwatch_core::error::{EngineError, Result};

use crate::config::Credentials;
use crate::http::{AUTH_TOKEN_HEADER, api_error, build_client, transport_error};
use crate::session::IdentitySession;

/// Hashmap services collection on the rating API.
const SERVICES_PATH: &str = "/v1/rating/hashmap/services";

/// Field every default mapping keys on.
const DEFAULT_FIELD: &str = "flavor";

/// Baseline prices per service and flavor value.
const DEFAULT_PRICING: &[(&str, &[(&str, f64)])] = &[
    ("instance", &[("small", 0.03), ("medium", 0.07), ("large", 0.12)]),
    ("volume", &[("standard", 0.10), ("ssd", 0.18)]),
    ("network.bw.out", &[("default", 0.02)]),
];

// ============================================================================
// Pricing Configurator
// ============================================================================

/// Administrative client for the rating service's hashmap pricing module.
pub struct PricingConfigurator {
    session: Arc<IdentitySession>,
    http: reqwest::Client,
}

impl PricingConfigurator {
    /// Builds the configurator from loaded credentials.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] when the HTTP client cannot be
    /// constructed.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = build_client(credentials.verify_tls)?;
        let session = Arc::new(IdentitySession::new(credentials, http.clone()));
        Ok(Self { session, http })
    }

    /// Builds the configurator over an existing session and HTTP client.
    pub fn with_session(session: Arc<IdentitySession>, http: reqwest::Client) -> Self {
        Self { session, http }
    }

    /// Ensures every default service, field, and mapping exists.
    ///
    /// Returns a JSON summary of the ensured configuration, one entry per
    /// service with its resolved ids and the mappings it covers.
    ///
    /// # Errors
    ///
    /// Propagates the first upstream failure; partially applied
    /// configuration is left in place and a re-run completes it.
    #[instrument(skip(self))]
    pub async fn ensure_defaults(&self) -> Result<Value> {
        let mut services = Vec::new();
        for (service_name, mappings) in DEFAULT_PRICING {
            debug!(service = service_name, "Ensuring hashmap pricing");
            let service_id = self.get_or_create_service(service_name).await?;
            let field_id = self.get_or_create_field(&service_id, DEFAULT_FIELD).await?;
            self.ensure_mappings(&field_id, mappings).await?;

            let mappings: Vec<Value> = mappings
                .iter()
                .map(|(value, cost)| json!({ "value": value, "cost": cost }))
                .collect();
            services.push(json!({
                "service": service_name,
                "service_id": service_id,
                "field_id": field_id,
                "mappings": mappings,
            }));
        }

        info!(services = services.len(), "Default hashmap pricing ensured");
        Ok(json!({ "services": services }))
    }

    async fn get_or_create_service(&self, name: &str) -> Result<String> {
        let listing = self.get(SERVICES_PATH).await?;
        if let Some(existing) = named_entry(&listing, "services", name) {
            debug!(service = name, "Hashmap service already exists");
            return require_id(existing, "service_id");
        }
        debug!(service = name, "Creating hashmap service");
        let created = self.post(SERVICES_PATH, &json!({ "name": name })).await?;
        require_id(&created, "service_id")
    }

    async fn get_or_create_field(&self, service_id: &str, name: &str) -> Result<String> {
        let path = format!("{SERVICES_PATH}/{service_id}/fields");
        let listing = self.get(&path).await?;
        if let Some(existing) = named_entry(&listing, "fields", name) {
            debug!(service_id, field = name, "Hashmap field already exists");
            return require_id(existing, "field_id");
        }
        debug!(service_id, field = name, "Creating hashmap field");
        let created = self.post(&path, &json!({ "name": name })).await?;
        require_id(&created, "field_id")
    }

    async fn ensure_mappings(&self, field_id: &str, mappings: &[(&str, f64)]) -> Result<()> {
        let path = format!("/v1/rating/hashmap/fields/{field_id}/mappings");
        let listing = self.get(&path).await?;
        let existing: Vec<&str> = listing
            .get("mappings")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|mapping| mapping.get("value").and_then(Value::as_str))
            .collect();

        for (value, cost) in mappings {
            if existing.contains(value) {
                debug!(field_id, value, "Mapping already exists");
                continue;
            }
            debug!(field_id, value, cost, "Creating mapping");
            self.post(&path, &json!({ "value": value, "cost": cost }))
                .await?;
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.request(reqwest::Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(reqwest::Method::POST, path, Some(body)).await
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let state = self.session.state().await?;
        let url = format!("{}{}", state.endpoint, path);

        let mut builder = self
            .http
            .request(method, &url)
            .header(AUTH_TOKEN_HEADER, &state.token);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| transport_error(&url, &e))?;
        if !response.status().is_success() {
            return Err(api_error(&url, response).await);
        }

        // Creation replies may carry no body at all.
        let text = response
            .text()
            .await
            .map_err(|e| EngineError::Transport(format!("unreadable payload from {url}: {e}")))?;
        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&text)
            .map_err(|e| EngineError::Transport(format!("unreadable payload from {url}: {e}")))
    }
}

impl std::fmt::Debug for PricingConfigurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingConfigurator").finish_non_exhaustive()
    }
}

// ============================================================================
// Payload Helpers
// ============================================================================

fn named_entry<'a>(listing: &'a Value, collection: &str, name: &str) -> Option<&'a Value> {
    listing
        .get(collection)?
        .as_array()?
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
}

fn require_id(node: &Value, key: &str) -> Result<String> {
    match node.get(key) {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(EngineError::BillingQuery(format!(
            "rating service reply missing '{key}'"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

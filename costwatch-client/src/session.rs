//! Identity session: authentication, token caching, endpoint discovery.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use costwatch_core::error::{EngineError, Result};

use crate::config::Credentials;
use crate::http::{AUTH_TOKEN_HEADER, SUBJECT_TOKEN_HEADER, transport_error};

/// Catalog service type of the billing service.
const RATING_SERVICE_TYPE: &str = "rating";

// ============================================================================
// Session State
// ============================================================================

/// The cached outcome of one successful authentication.
///
/// Published atomically as a complete value: concurrent first-auth races may
/// authenticate redundantly, but no caller ever observes a token without its
/// endpoint or vice versa.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Opaque bearer token.
    pub token: String,
    /// Resolved billing endpoint base URL, no trailing slash.
    pub endpoint: String,
}

// ============================================================================
// Identity Session
// ============================================================================

/// Password-scoped identity session with an indefinite token cache.
///
/// The token is cached for the process lifetime once set; there is no expiry
/// detection and no 401-triggered refresh. A stale token surfaces as an
/// upstream failure on the next call.
pub struct IdentitySession {
    credentials: Credentials,
    http: reqwest::Client,
    state: RwLock<Option<Arc<SessionState>>>,
}

impl IdentitySession {
    /// Creates an unauthenticated session over a shared HTTP client.
    pub fn new(credentials: Credentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            state: RwLock::new(None),
        }
    }

    /// Returns the cached session state, authenticating first when empty.
    pub async fn state(&self) -> Result<Arc<SessionState>> {
        if let Some(state) = self.state.read().await.as_ref() {
            return Ok(Arc::clone(state));
        }
        debug!("No cached token; authenticating");
        self.authenticate().await
    }

    /// Authenticates against the identity token-issuance endpoint.
    ///
    /// Success is a 200/201 response carrying a subject-token header. When no
    /// billing endpoint was pre-configured, the returned service catalog is
    /// scanned for a rating endpoint matching the configured region and
    /// interface.
    ///
    /// # Errors
    ///
    /// Any other status, a missing token header, or an unmatched catalog
    /// yields [`EngineError::Authentication`].
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<Arc<SessionState>> {
        let url = &self.credentials.token_url;
        debug!(url = %url, "Authenticating against identity service");

        // Transport failures at this step are authentication failures to the
        // caller; the raw transport taxonomy never crosses this boundary.
        let response = self
            .http
            .post(url)
            .json(&self.auth_payload())
            .send()
            .await
            .map_err(|e| EngineError::Authentication(transport_error(url, &e).to_string()))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Authentication(format!(
                "identity service returned {status}: {body}"
            )));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                EngineError::Authentication("no subject token in identity response".to_string())
            })?;

        let endpoint = match &self.credentials.billing_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let catalog: Value = response.json().await.map_err(|e| {
                    EngineError::Authentication(format!("unreadable identity response: {e}"))
                })?;
                self.find_rating_endpoint(&catalog)?
            }
        };

        let state = Arc::new(SessionState { token, endpoint });
        *self.state.write().await = Some(Arc::clone(&state));
        info!(endpoint = %state.endpoint, "Authenticated; billing endpoint resolved");
        Ok(state)
    }

    /// Verifies that the project id exists at the identity service.
    ///
    /// # Errors
    ///
    /// A 404 lookup yields [`EngineError::ProjectNotFound`]; any other
    /// failure is wrapped into [`EngineError::Authentication`].
    #[instrument(skip(self))]
    pub async fn ensure_project_exists(&self, project_id: &str) -> Result<()> {
        let state = self.state().await?;
        let url = self.credentials.project_url(project_id)?;
        debug!(url = %url, "Verifying project existence");

        let unverifiable = |detail: String| {
            EngineError::Authentication(format!(
                "unable to verify project '{project_id}': {detail}"
            ))
        };

        let response = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &state.token)
            .send()
            .await
            .map_err(|e| unverifiable(transport_error(&url, &e).to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EngineError::ProjectNotFound(project_id.to_string()));
        }
        if !status.is_success() {
            return Err(unverifiable(format!("HTTP {status}")));
        }
        Ok(())
    }

    fn auth_payload(&self) -> Value {
        serde_json::json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.credentials.username,
                            "domain": { "name": self.credentials.user_domain },
                            "password": self.credentials.password,
                        }
                    },
                },
                "scope": { "project": self.credentials.project_scope.to_payload() },
            }
        })
    }

    /// Scans the service catalog for a rating endpoint matching the
    /// configured region (when set) and interface class.
    fn find_rating_endpoint(&self, catalog: &Value) -> Result<String> {
        let services = catalog
            .pointer("/token/catalog")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for service in services {
            if service.get("type").and_then(Value::as_str) != Some(RATING_SERVICE_TYPE) {
                continue;
            }
            let endpoints = service
                .get("endpoints")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for endpoint in endpoints {
                if let Some(region) = &self.credentials.region {
                    if endpoint.get("region").and_then(Value::as_str) != Some(region.as_str()) {
                        continue;
                    }
                }
                if endpoint.get("interface").and_then(Value::as_str)
                    != Some(self.credentials.interface.as_str())
                {
                    continue;
                }
                if let Some(url) = endpoint.get("url").and_then(Value::as_str) {
                    return Ok(url.trim_end_matches('/').to_string());
                }
            }
        }

        Err(EngineError::Authentication(
            "rating endpoint not found in service catalog; set CLOUDKITTY_ENDPOINT".to_string(),
        ))
    }
}

impl std::fmt::Debug for IdentitySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySession")
            .field("auth_url", &self.credentials.auth_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

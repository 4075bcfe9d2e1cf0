//! Shared HTTP client construction and error mapping.

use std::time::Duration;

use costwatch_core::error::{EngineError, Result};

/// Upper bound for every outbound call.
pub(crate) const UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Header carrying the bearer token on authenticated calls.
pub(crate) const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Header carrying the issued token on the token-issuance response.
pub(crate) const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Builds the shared upstream client with the fixed timeout.
pub(crate) fn build_client(verify_tls: bool) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
        .user_agent(concat!("costwatch/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|e| EngineError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Maps a send-level `reqwest` failure into the transport taxonomy.
pub(crate) fn transport_error(url: &str, error: &reqwest::Error) -> EngineError {
    if error.is_timeout() {
        EngineError::Transport(format!("timed out calling {url}"))
    } else {
        EngineError::Transport(format!("failed calling {url}: {error}"))
    }
}

/// Drains a non-2xx response into an [`EngineError::Api`] with diagnostics.
pub(crate) async fn api_error(url: &str, response: reqwest::Response) -> EngineError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    EngineError::Api {
        status,
        url: url.to_string(),
        body,
    }
}

//! Error taxonomy shared across the Costwatch crates.

use thiserror::Error;

/// Error type for every engine operation.
///
/// The variants are deliberately coarse: the HTTP layer branches on them to
/// pick a status code, so each variant corresponds to exactly one class of
/// caller-visible outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or invalid credential configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The identity service rejected or failed the request, or the service
    /// catalog held no usable billing endpoint.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The identity service confirmed the project id does not exist.
    #[error("Project '{0}' does not exist")]
    ProjectNotFound(String),

    /// Every billing endpoint candidate failed.
    #[error("Billing query failed: {0}")]
    BillingQuery(String),

    /// Non-2xx reply from an upstream service, with diagnostics.
    #[error("HTTP {status} calling {url}: {body}")]
    Api {
        /// Upstream HTTP status code.
        status: u16,
        /// The URL that was called.
        url: String,
        /// Response body, verbatim.
        body: String,
    },

    /// Network-level failure reaching an upstream: DNS, connect, TLS, timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed caller input, such as a bad month or date string.
    #[error("{0}")]
    InvalidRange(String),
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Costwatch Client
//!
//! Upstream access for the Costwatch engine:
//!
//! - [`Credentials`] - process-wide credential configuration, loaded once
//! - [`IdentitySession`] - password-scoped authentication, token caching, and
//!   billing endpoint discovery from the identity service catalog
//! - [`BillingClient`] - authenticated billing summary queries with an
//!   ordered endpoint-shape fallback chain
//! - [`PricingConfigurator`] - idempotent default hashmap pricing setup on
//!   the rating service
//! - [`CostEngine`] - the single entry point the HTTP layer consumes: range
//!   resolution, project verification, aggregate + series fetching
//!
//! Every operation returns `costwatch_core::EngineError`; nothing here
//! retries automatically, and each request fails independently.

pub mod billing;
pub mod config;
pub mod engine;
mod http;
pub mod pricing;
pub mod session;

pub use billing::BillingClient;
pub use config::{Credentials, ProjectScope};
pub use engine::CostEngine;
pub use pricing::PricingConfigurator;
pub use session::IdentitySession;

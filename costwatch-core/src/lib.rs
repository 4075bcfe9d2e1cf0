// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Costwatch Core
//!
//! Core types and pure logic for the Costwatch cost dashboard.
//!
//! This crate holds everything that needs no network access:
//!
//! - Domain models ([`CostPoint`], [`CostReport`], [`RangeRequest`])
//! - The error taxonomy shared across all Costwatch crates ([`EngineError`])
//! - Calendar window arithmetic ([`calendar`])
//! - Recursive cost extraction over arbitrary billing payloads ([`extract`])
//!
//! The `costwatch-client` crate builds the upstream-facing engine on top of
//! these, and `costwatch-server` maps the error taxonomy onto HTTP statuses.

pub mod calendar;
pub mod error;
pub mod extract;
pub mod models;

pub use error::EngineError;
pub use models::{CostPoint, CostReport, RangeRequest, ResolvedRange};

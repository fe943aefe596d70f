//! Scoring core for the institutional self-assessment platform.
//!
//! Respondents answer a weighted item hierarchy (item -> theme -> template)
//! with heterogeneous value shapes; this crate converts those answers into a
//! comparable 0-100 quality score, cross-validates them for contradictions,
//! and derives an early-warning risk signal. Free-text answers are scored
//! through an external text-evaluation service wrapped with caching, retry,
//! and cost accounting. Long-running runs are tracked as jobs.

pub mod assessment;
pub mod calc;
pub mod config;
pub mod consistency;
pub mod error;
pub mod evaluator;
pub mod jobs;
pub mod risk;
pub mod router;
pub mod scoring;
pub mod service;
pub mod telemetry;

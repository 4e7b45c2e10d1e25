//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the severity assessment use case.

mod assessment;
pub mod classifier;

pub use assessment::AssessmentService;

#[cfg(test)]
pub(crate) use assessment::fixture_service;

//! Scenario-based tests for cirun

mod cancellation;
mod failure_isolation;
mod matrix_success;
mod timeouts;
mod trigger_validation;

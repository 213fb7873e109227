//! Heart risk prediction service
//!
//! Serves the inference adapter over HTTP alongside health and metrics endpoints.

pub mod api;
pub mod config;

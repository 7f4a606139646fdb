//! HTTP server for the TON rewards backend.
//!
//! Exposes the `ton_rewards` managers over an axum router with bearer
//! token authentication, structured logging and Prometheus metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;

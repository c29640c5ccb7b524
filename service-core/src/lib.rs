//! Shared infrastructure for the marketplace services: errors, base config,
//! tracing, HTTP middleware and formatting helpers.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod utils;

pub use axum;

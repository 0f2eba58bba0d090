//! Load generation engine for HTTP services.
//!
//! Provides weighted scenario registries, virtual users with private
//! session state, a run controller with ramp-up and graceful shutdown,
//! HdrHistogram-based statistics, and typed TOML configuration.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;
pub mod scenario;
pub mod state;
pub mod step;
pub mod summary;
pub mod vu;

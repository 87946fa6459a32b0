//! # gridlog - telemetry collector for a home battery gateway
//!
//! Logs in once to the gateway's local HTTPS API, polls grid status, battery
//! state of charge and the meter aggregates on a fixed cadence, appends each
//! sample as a tab-separated line and atomically publishes the latest sample
//! as a JSON state file.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `cli`: Command-line overrides
//! - `logging`: Structured logging and tracing
//! - `session`: Authenticated gateway session and metric fetches
//! - `sampler`: Assembles one normalized sample per tick
//! - `scheduler`: Drift-correcting periodic loop with cooperative shutdown
//! - `timeseries`: Append-only tab-separated output
//! - `persistence`: Atomic state file publication
//! - `driver`: Wires the above into the poll cycle

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod sampler;
pub mod scheduler;
pub mod session;
pub mod timeseries;

// Re-export commonly used types
pub use config::Config;
pub use driver::TelemetryDriver;
pub use error::{GridlogError, Result};
pub use sampler::Sample;

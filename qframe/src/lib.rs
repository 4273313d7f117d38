//! qframe library crate.
//!
//! Exposes the modules behind the `qframe` binary for tests and benchmarks.

pub mod config;
pub mod decode;
pub mod netio;
pub mod send;
pub mod telemetry;

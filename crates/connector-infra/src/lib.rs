//! Connector infrastructure: process-wide telemetry initialization, kept in
//! its own crate so the domain crates never depend on `tracing-subscriber`
//! directly.

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry};

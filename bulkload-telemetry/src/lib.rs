//! Telemetry for the bulk loader: `tracing` subscriber setup for binaries and tests.

pub mod tracing;

//! Observability subsystem.
//!
//! Structured logging is initialized in `main` via `tracing-subscriber`;
//! this module owns the Prometheus metrics endpoint and the recording
//! helpers the rest of the gateway calls.

pub mod metrics;

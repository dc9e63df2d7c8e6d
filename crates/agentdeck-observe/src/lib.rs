//! Observability setup for agentdeck: structured logging and optional
//! OpenTelemetry trace export.

pub mod tracing_setup;

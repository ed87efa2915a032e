//! Observability setup shared by the credsync binary.

pub mod tracing_setup;

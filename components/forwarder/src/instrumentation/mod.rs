//! Diagnostics setup.

pub mod tracing;

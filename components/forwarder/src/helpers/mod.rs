//! Small self-contained helpers: destination parsing and runtime configuration.

pub mod destination;
pub mod load_config;

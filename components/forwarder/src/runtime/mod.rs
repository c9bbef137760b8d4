//! Process wiring.

pub mod runtime;

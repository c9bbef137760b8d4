//! The fan-out line-forwarding pipeline.

pub mod fanout;
pub mod line_reader;
pub mod sinks;

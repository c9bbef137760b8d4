//! RFC-5424 framing for outbound lines.

pub mod framer;

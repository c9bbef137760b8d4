//! `forwarder` relays newline-delimited stdin to a remote destination over
//! UDP, TCP, or TCP+TLS, optionally teeing the input to stdout and wrapping
//! each line in an RFC-5424 Syslog header.
//!
//! ```text
//! stdin -> FanoutPipeline -+-> tee sink -> stdout
//!                          +-> network sink -> SyslogFramer -> Connection
//! ```

pub mod cli;
pub mod helpers;
pub mod instrumentation;
pub mod pipeline;
pub mod runtime;
pub mod syslog;
pub mod transport;

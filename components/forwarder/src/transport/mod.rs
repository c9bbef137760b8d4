//! Outbound connections.

pub mod connection;
pub mod connector;

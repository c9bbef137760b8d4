//! Syntactic validation of `host:port` destinations.
//!
//! Validation is purely textual: no DNS lookups, no socket work. The host
//! segment is split on the one and only `:`, so IPv6 literals (which carry
//! colons of their own) are rejected.

// External crates
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// Reasons a raw destination string is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("destination is empty")]
    Empty,
    #[error("destination must contain exactly one ':' separator, found {0}")]
    Separators(usize),
    #[error("destination host is empty")]
    EmptyHost,
    #[error("destination port is empty")]
    EmptyPort,
    #[error("destination port {0:?} is not a base-10 integer")]
    InvalidPort(String),
    #[error("destination port {0} is outside 1-65535")]
    PortOutOfRange(i64),
}

/// A validated remote endpoint. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    host: String,
    port: u16,
}

/// Returns `true` when `raw` is a syntactically well-formed `host:port`.
///
/// The port only has to be a base-10 integer here (an optional sign is
/// accepted); the 1-65535 range is enforced by [`Destination::parse`].
pub fn validate(raw: &str) -> bool {
    check(raw).is_ok()
}

fn check(raw: &str) -> Result<(&str, i64), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 2 {
        return Err(ValidationError::Separators(parts.len() - 1));
    }

    let (host, port) = (parts[0], parts[1]);
    if host.is_empty() {
        return Err(ValidationError::EmptyHost);
    }
    if port.is_empty() {
        return Err(ValidationError::EmptyPort);
    }

    let port = port
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidPort(port.to_string()))?;

    Ok((host, port))
}

impl Destination {
    /// Parse and validate a raw `host:port` string.
    #[instrument(
        name = "forwarder::destination::parse",
        target = "helpers::destination",
        level = "trace"
    )]
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let (host, port) = check(raw)?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(ValidationError::PortOutOfRange(port))?;

        tracing::trace!(host, port, "Destination validated");
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for Destination {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_only_single_colon_with_integer_port() {
        assert!(!validate(""));
        assert!(!validate("host"));
        assert!(validate("host:80"));
        assert!(!validate("host:abc"));
        assert!(!validate("h:1:2"));
    }

    #[test]
    fn validate_rejects_empty_segments() {
        assert!(!validate(":80"));
        assert!(!validate("host:"));
        assert!(!validate(":"));
    }

    #[test]
    fn validate_rejects_ipv6_literals() {
        assert!(!validate("::1:514"));
        assert!(!validate("[::1]:514"));
    }

    #[test]
    fn validate_is_syntactic_only() {
        // A signed integer passes validation; the range check belongs to parse.
        assert!(validate("host:-1"));
        assert!(validate("host:+514"));
        assert!(validate("host:70000"));
    }

    #[test]
    fn parse_builds_destination() {
        let dest = Destination::parse("logs.example.com:6514").unwrap();
        assert_eq!(dest.host(), "logs.example.com");
        assert_eq!(dest.port(), 6514);
        assert_eq!(dest.to_string(), "logs.example.com:6514");
    }

    #[test]
    fn parse_reports_reason() {
        assert_eq!(Destination::parse(""), Err(ValidationError::Empty));
        assert_eq!(
            Destination::parse("h:1:2"),
            Err(ValidationError::Separators(2))
        );
        assert_eq!(Destination::parse(":1"), Err(ValidationError::EmptyHost));
        assert_eq!(Destination::parse("h:"), Err(ValidationError::EmptyPort));
        assert_eq!(
            Destination::parse("h:x"),
            Err(ValidationError::InvalidPort("x".into()))
        );
        assert_eq!(
            Destination::parse("h:0"),
            Err(ValidationError::PortOutOfRange(0))
        );
        assert_eq!(
            Destination::parse("h:65536"),
            Err(ValidationError::PortOutOfRange(65536))
        );
        assert!("h:65535".parse::<Destination>().is_ok());
    }
}

//! Immutable runtime configuration, assembled once from the command line.

// External crates
use std::fmt;
use tracing::instrument;

/// Default Syslog APP-NAME.
pub const DEFAULT_SYSLOG_APP: &str = "logger";
/// Default Syslog PRI value (facility 2 `mail`, severity 6 `info`).
pub const DEFAULT_SYSLOG_PRIORITY: i32 = 22;

/// How the outbound connection is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Udp,
    Tcp,
    TcpTls,
}

impl TransportMode {
    /// Resolve the transport from the CLI switches. UDP wins over TLS.
    pub fn from_flags(udp: bool, tls: bool) -> Self {
        match (udp, tls) {
            (true, _) => Self::Udp,
            (false, false) => Self::Tcp,
            (false, true) => Self::TcpTls,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::TcpTls => "tcp+tls",
        };
        f.write_str(name)
    }
}

/// Fields of the RFC-5424 header attached to outbound lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogConfig {
    pub hostname: String,
    pub app_name: String,
    /// Carried verbatim into `<PRI>`, no facility/severity range check.
    pub priority: i32,
    /// When false, lines go out through the accumulation buffer without a header.
    pub attach_header_per_line: bool,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            hostname: local_hostname(),
            app_name: DEFAULT_SYSLOG_APP.to_string(),
            priority: DEFAULT_SYSLOG_PRIORITY,
            attach_header_per_line: false,
        }
    }
}

/// Everything the pipeline needs besides the destination and the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardConfig {
    pub mode: TransportMode,
    pub tee: bool,
    pub syslog: Option<SyslogConfig>,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::TcpTls,
            tee: true,
            syslog: None,
        }
    }
}

/// Local host name, or an empty string when the OS won't tell us.
#[instrument(
    name = "forwarder::config::local_hostname",
    target = "helpers::load_config",
    level = "trace"
)]
pub fn local_hostname() -> String {
    match sysinfo::System::host_name() {
        Some(name) => name,
        None => {
            tracing::warn!("Could not determine local host name, Syslog HOSTNAME will be empty");
            String::new()
        }
    }
}

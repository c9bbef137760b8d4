// Local crates
use crate::{
    helpers::load_config::{
        DEFAULT_SYSLOG_APP, DEFAULT_SYSLOG_PRIORITY, ForwardConfig, SyslogConfig, TransportMode,
        local_hostname,
    },
    runtime,
};

// External crates
use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "forward",
    about = "Transport StdIn lines to a remote destination over UDP, TCP, or TCP+TLS",
    override_usage = "forward [global options] [syslog [syslog options]] address:port",
    version,
    term_width = 100,
    after_help = "\
    EXAMPLES:
        tail -f app.log | forward logs.example.com:6514
        my_service 2>&1 | forward --tls=false syslog --app my_service 10.0.0.5:514"
)]
pub struct Cli {
    /// Send via UDP (will ignore TLS)
    #[arg(short = 'u', long, global = true)]
    pub udp: bool,

    /// TLS-secured TCP connection
    #[arg(
        short = 's',
        long,
        global = true,
        action = ArgAction::Set,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    pub tls: bool,

    /// Tee stdin to stdout
    #[arg(
        short = 't',
        long,
        global = true,
        action = ArgAction::Set,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    pub tee: bool,

    /// Emit diagnostics on stderr as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// address:port to forward to
    pub destination: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Wrap lines in RFC-5424 Syslog format
    #[command(visible_alias = "log")]
    Syslog(SyslogArgs),
}

#[derive(Debug, clap::Args)]
pub struct SyslogArgs {
    /// HOSTNAME field, defaults to the local host name
    #[arg(short = 'n', long)]
    pub hostname: Option<String>,

    /// APP-NAME field
    #[arg(short = 'a', long = "app", default_value = DEFAULT_SYSLOG_APP)]
    pub app: String,

    /// PRI field, sent verbatim
    #[arg(short = 'p', long, default_value_t = DEFAULT_SYSLOG_PRIORITY, allow_negative_numbers = true)]
    pub priority: i32,

    /// Attach header to message
    #[arg(short = 'x', long = "att")]
    pub attach_header: bool,

    /// address:port to forward to
    pub destination: Option<String>,
}

impl Cli {
    /// Build the immutable run configuration and pick the destination.
    pub fn into_parts(self) -> (ForwardConfig, Option<String>) {
        let mode = TransportMode::from_flags(self.udp, self.tls);

        match self.command {
            Some(Commands::Syslog(args)) => {
                let syslog = SyslogConfig {
                    hostname: args.hostname.unwrap_or_else(local_hostname),
                    app_name: args.app,
                    priority: args.priority,
                    attach_header_per_line: args.attach_header,
                };
                let config = ForwardConfig {
                    mode,
                    tee: self.tee,
                    syslog: Some(syslog),
                };
                (config, args.destination)
            }
            None => {
                let config = ForwardConfig {
                    mode,
                    tee: self.tee,
                    syslog: None,
                };
                (config, self.destination)
            }
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Print the top-level usage text to stdout.
pub fn print_usage() -> Result<()> {
    Cli::command()
        .print_help()
        .context("Failed to print usage")
}

/// Entry function for CLI
pub async fn run(cli: Cli) -> Result<()> {
    let (config, destination) = cli.into_parts();
    runtime::runtime::run_forwarder(config, destination.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (ForwardConfig, Option<String>) {
        Cli::try_parse_from(args).unwrap().into_parts()
    }

    #[test]
    fn defaults_are_tls_with_tee() {
        let (config, dest) = parse(&["forward", "host:6514"]);
        assert_eq!(config.mode, TransportMode::TcpTls);
        assert!(config.tee);
        assert!(config.syslog.is_none());
        assert_eq!(dest.as_deref(), Some("host:6514"));
    }

    #[test]
    fn bool_flags_accept_explicit_values() {
        let (config, _) = parse(&["forward", "--tls=false", "-t=false", "host:514"]);
        assert_eq!(config.mode, TransportMode::Tcp);
        assert!(!config.tee);
    }

    #[test]
    fn bare_bool_flag_does_not_swallow_destination() {
        let (config, dest) = parse(&["forward", "-s", "-t", "host:514"]);
        assert_eq!(config.mode, TransportMode::TcpTls);
        assert!(config.tee);
        assert_eq!(dest.as_deref(), Some("host:514"));
    }

    #[test]
    fn udp_ignores_tls() {
        let (config, _) = parse(&["forward", "-u", "host:514"]);
        assert_eq!(config.mode, TransportMode::Udp);
    }

    #[test]
    fn destination_is_optional() {
        let (_, dest) = parse(&["forward"]);
        assert!(dest.is_none());
    }

    #[test]
    fn syslog_subcommand_and_alias() {
        let (config, dest) = parse(&[
            "forward", "-u", "syslog", "-n", "web1", "-a", "nginx", "-p", "14", "-x", "host:514",
        ]);
        let syslog = config.syslog.unwrap();
        assert_eq!(config.mode, TransportMode::Udp);
        assert_eq!(syslog.hostname, "web1");
        assert_eq!(syslog.app_name, "nginx");
        assert_eq!(syslog.priority, 14);
        assert!(syslog.attach_header_per_line);
        assert_eq!(dest.as_deref(), Some("host:514"));

        let (config, _) = parse(&["forward", "log", "host:514"]);
        let syslog = config.syslog.unwrap();
        assert_eq!(syslog.app_name, "logger");
        assert_eq!(syslog.priority, 22);
        assert!(!syslog.attach_header_per_line);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}

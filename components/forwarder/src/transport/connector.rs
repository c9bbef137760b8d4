//! Transport Connector
//!
//! Opens the single outbound connection for a run. Failure here is never
//! fatal to the process: the runtime logs it and carries on without a
//! network sink.
//!
//! - UDP: bind an ephemeral local socket of the peer's address family and
//!   `connect` it. Nothing goes over the wire, so a dead remote port is not
//!   noticed here.
//! - TCP: plain stream connect with the OS default timeout.
//! - TCP+TLS: stream connect, then a rustls handshake against the Mozilla
//!   root store (`webpki-roots`). No client certificate, library default
//!   protocol versions and cipher suites.

// Local crates
use crate::{
    helpers::{destination::Destination, load_config::TransportMode},
    transport::connection::Connection,
};

// External crates
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use tokio::net::{TcpStream, UdpSocket, lookup_host};
use tokio_rustls::TlsConnector;
use tracing::instrument;

static INIT_CRYPTO: Once = Once::new();

fn init_crypto_provider() {
    INIT_CRYPTO.call_once(|| {
        // Err means another provider was installed first, which is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Why a connection could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("failed to resolve {destination}: {source}")]
    Resolve {
        destination: String,
        #[source]
        source: io::Error,
    },
    #[error("no addresses found for {0}")]
    NoAddress(String),
    #[error("dial {destination}: {source}")]
    Io {
        destination: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid TLS server name {0:?}")]
    ServerName(String),
    #[error("TLS handshake with {destination} failed: {source}")]
    Tls {
        destination: String,
        #[source]
        source: io::Error,
    },
}

/// Client TLS settings trusting the bundled Mozilla root store.
pub fn default_tls_config() -> Arc<ClientConfig> {
    init_crypto_provider();

    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Arc::new(config)
}

/// Open one outbound connection to `destination` using `mode`.
#[instrument(
    name = "forwarder::connector::connect",
    target = "transport::connector",
    skip_all,
    fields(destination = %destination, mode = %mode),
    level = "debug"
)]
pub async fn connect(
    destination: &Destination,
    mode: TransportMode,
) -> Result<Connection, ConnectError> {
    let conn = match mode {
        TransportMode::Udp => connect_udp(destination).await?,
        TransportMode::Tcp => Connection::Tcp(connect_tcp(destination).await?),
        TransportMode::TcpTls => connect_tls(destination, default_tls_config()).await?,
    };

    tracing::debug!(peer = ?conn.peer_addr().ok(), "Outbound connection established");
    Ok(conn)
}

async fn connect_udp(destination: &Destination) -> Result<Connection, ConnectError> {
    let peer = resolve(destination).await?;

    // Let the OS pick the local port, same family as the peer.
    let local: SocketAddr = if peer.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };

    let io_err = |source| ConnectError::Io {
        destination: destination.to_string(),
        source,
    };
    let socket = UdpSocket::bind(local).await.map_err(io_err)?;
    socket.connect(peer).await.map_err(io_err)?;

    tracing::trace!(%peer, "UDP socket bound and connected");
    Ok(Connection::Udp(socket))
}

async fn connect_tcp(destination: &Destination) -> Result<TcpStream, ConnectError> {
    TcpStream::connect((destination.host(), destination.port()))
        .await
        .map_err(|source| ConnectError::Io {
            destination: destination.to_string(),
            source,
        })
}

/// TCP connect followed by a TLS handshake using `config`.
pub async fn connect_tls(
    destination: &Destination,
    config: Arc<ClientConfig>,
) -> Result<Connection, ConnectError> {
    let server_name = ServerName::try_from(destination.host().to_string())
        .map_err(|_| ConnectError::ServerName(destination.host().to_string()))?;

    let stream = connect_tcp(destination).await?;
    tracing::trace!("TCP connected, starting TLS handshake");

    let tls = TlsConnector::from(config)
        .connect(server_name, stream)
        .await
        .map_err(|source| ConnectError::Tls {
            destination: destination.to_string(),
            source,
        })?;

    Ok(Connection::Tls(Box::new(tls)))
}

async fn resolve(destination: &Destination) -> Result<SocketAddr, ConnectError> {
    let mut addrs = lookup_host((destination.host(), destination.port()))
        .await
        .map_err(|source| ConnectError::Resolve {
            destination: destination.to_string(),
            source,
        })?;

    addrs
        .next()
        .ok_or_else(|| ConnectError::NoAddress(destination.to_string()))
}

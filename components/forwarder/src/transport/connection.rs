//! The live outbound connection handle and the `Transport` seam the network
//! sink writes through.

// External crates
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio_rustls::client::TlsStream;

/// Write end of an outbound connection.
///
/// Implementations are owned by exactly one task at a time, so `&mut self`
/// is all the synchronization they get.
pub trait Transport: Send + 'static {
    /// Write all of `data`. For datagram transports this is one datagram.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Release the connection. Called once, after the last `send`.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Duplex connection opened by the connector.
#[derive(Debug)]
pub enum Connection {
    Udp(UdpSocket),
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Connection {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Self::Udp(socket) => socket.peer_addr(),
            Self::Tcp(stream) => stream.peer_addr(),
            Self::Tls(stream) => stream.get_ref().0.peer_addr(),
        }
    }
}

impl Transport for Connection {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Udp(socket) => {
                let sent = socket.send(data).await?;
                if sent != data.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("datagram truncated: sent {sent} of {} bytes", data.len()),
                    ));
                }
                Ok(())
            }
            Self::Tcp(stream) => stream.write_all(data).await,
            Self::Tls(stream) => {
                stream.write_all(data).await?;
                // rustls holds records until flushed
                stream.flush().await
            }
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        match self {
            Self::Udp(_) => Ok(()),
            Self::Tcp(stream) => stream.shutdown().await,
            Self::Tls(stream) => stream.shutdown().await,
        }
    }
}

//! End-to-end forwarding over real localhost sockets.

use forwarder::helpers::destination::Destination;
use forwarder::helpers::load_config::{ForwardConfig, SyslogConfig, TransportMode};
use forwarder::runtime::runtime::forward;
use std::time::Duration;
use tokio::io::{AsyncReadExt, duplex};
use tokio::net::{TcpListener, UdpSocket};

fn local(port: u16) -> Destination {
    Destination::parse(&format!("127.0.0.1:{port}")).unwrap()
}

fn config(mode: TransportMode, tee: bool, syslog: Option<SyslogConfig>) -> ForwardConfig {
    ForwardConfig { mode, tee, syslog }
}

#[tokio::test]
async fn tcp_receives_lines_and_sees_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        // read_to_end only returns once the forwarder shuts the stream down
        sock.read_to_end(&mut received).await.unwrap();
        received
    });

    let (tee_out, _tee_in) = duplex(64 * 1024);
    let report = forward(
        &config(TransportMode::Tcp, false, None),
        &local(port),
        &b"alpha\nbeta\ngamma"[..],
        tee_out,
    )
    .await;

    assert_eq!(server.await.unwrap(), b"alpha\nbeta\n");
    assert_eq!(report.network.unwrap().dropped_partial, "gamma".len());
}

#[tokio::test]
async fn udp_sends_one_datagram_per_line() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let syslog = SyslogConfig {
        hostname: "box".into(),
        app_name: "cron".into(),
        priority: 78,
        attach_header_per_line: true,
    };
    let (tee_out, _tee_in) = duplex(64 * 1024);
    let report = forward(
        &config(TransportMode::Udp, false, Some(syslog)),
        &local(port),
        &b"job started\njob finished\n"[..],
        tee_out,
    )
    .await;
    assert_eq!(report.network.unwrap().writes, 2);

    let mut buf = [0u8; 512];
    for expected in ["job started\n", "job finished\n"] {
        let n = tokio::time::timeout(Duration::from_secs(5), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let datagram = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(datagram.starts_with("<78>1 "), "{datagram}");
        assert!(datagram.ends_with(&format!(" box cron - - - {expected}")), "{datagram}");
    }
}

#[tokio::test]
async fn refused_connection_degrades_to_tee_only() {
    // Grab a port and free it so nothing is listening there.
    let port = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let input: Vec<u8> = (0..500)
        .flat_map(|i| format!("record {i}\n").into_bytes())
        .collect();
    let (tee_out, mut tee_in) = duplex(1024);

    // Read the tee concurrently, the duplex buffer is smaller than the input.
    let reader = tokio::spawn(async move {
        let mut echoed = Vec::new();
        tee_in.read_to_end(&mut echoed).await.unwrap();
        echoed
    });

    let report = forward(
        &config(TransportMode::Tcp, true, None),
        &local(port),
        &input[..],
        tee_out,
    )
    .await;

    assert!(report.network.is_none());
    assert_eq!(report.bytes_read, input.len() as u64);
    assert_eq!(reader.await.unwrap(), input);
}

#[tokio::test]
async fn refused_connection_without_tee_still_drains_input() {
    let port = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let input = vec![b'x'; 100_000];

    let (tee_out, _tee_in) = duplex(16);
    let report = forward(
        &config(TransportMode::Tcp, false, None),
        &local(port),
        &input[..],
        tee_out,
    )
    .await;

    assert_eq!(report.bytes_read, 100_000);
    assert!(report.tee.is_none());
}

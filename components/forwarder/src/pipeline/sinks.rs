//! Sink tasks fed by the fan-out pipeline.
//!
//! Each sink owns the receiving end of its own bounded chunk channel and
//! runs as an independent task, so a slow network peer never stalls the
//! tee and vice versa. A sink that fails stops writing but keeps draining
//! its channel until the pipeline closes it, so the producer never blocks on
//! a dead consumer.

// Local crates
use crate::{
    pipeline::line_reader::{LineReader, channel_reader},
    syslog::framer::SyslogFramer,
    transport::connection::Transport,
};

// External crates
use bytes::Bytes;
use std::fmt;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::instrument;

/// Which downstream consumer a report or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Tee,
    Network,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tee => f.write_str("tee"),
            Self::Network => f.write_str("network"),
        }
    }
}

/// Mid-stream sink failures. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("{sink} sink write failed: {source}")]
    Write {
        sink: SinkKind,
        #[source]
        source: io::Error,
    },
    #[error("{sink} sink input failed: {source}")]
    Read {
        sink: SinkKind,
        #[source]
        source: io::Error,
    },
    #[error("{sink} sink task did not complete: {reason}")]
    Task { sink: SinkKind, reason: String },
}

/// What a sink did with its copy of the input.
#[derive(Debug, Default)]
pub struct SinkReport {
    /// Bytes handed to the output, after any Syslog framing.
    pub bytes_written: u64,
    /// Writes performed; for the network sink this is one per line.
    pub writes: u64,
    /// Input bytes thrown away after a failure.
    pub bytes_discarded: u64,
    /// Length of the unterminated trailing line the network sink dropped.
    pub dropped_partial: usize,
    pub failure: Option<SinkError>,
}

impl SinkReport {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Relay chunks to `out` unchanged, flushing after each one.
#[instrument(name = "forwarder::sink::tee", target = "pipeline::sinks", skip_all, level = "debug")]
pub async fn run_tee_sink<W>(mut rx: mpsc::Receiver<Bytes>, mut out: W) -> SinkReport
where
    W: AsyncWrite + Unpin + Send,
{
    let mut report = SinkReport::default();

    while let Some(chunk) = rx.recv().await {
        let written = async {
            out.write_all(&chunk).await?;
            out.flush().await
        }
        .await;

        if let Err(source) = written {
            tracing::error!(error = %source, "Tee output failed, discarding remaining input");
            report.bytes_discarded += chunk.len() as u64;
            report.failure = Some(SinkError::Write {
                sink: SinkKind::Tee,
                source,
            });
            break;
        }

        report.bytes_written += chunk.len() as u64;
        report.writes += 1;
    }

    while let Some(chunk) = rx.recv().await {
        report.bytes_discarded += chunk.len() as u64;
    }

    tracing::debug!(
        bytes_written = report.bytes_written,
        bytes_discarded = report.bytes_discarded,
        "Tee sink drained"
    );
    report
}

/// Split chunks into lines, frame them if Syslog is on, and send each one
/// through `transport`. The transport is handed back so the pipeline can
/// close it after the task has finished.
#[instrument(
    name = "forwarder::sink::network",
    target = "pipeline::sinks",
    skip_all,
    level = "debug"
)]
pub async fn run_network_sink<T>(
    rx: mpsc::Receiver<Bytes>,
    mut transport: T,
    mut framer: Option<SyslogFramer>,
) -> (T, SinkReport)
where
    T: Transport,
{
    let mut report = SinkReport::default();
    let mut lines = LineReader::new(channel_reader(rx));

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(source) => {
                tracing::error!(error = %source, "Network sink input failed");
                report.failure = Some(SinkError::Read {
                    sink: SinkKind::Network,
                    source,
                });
                break;
            }
        };

        let payload = match framer.as_mut() {
            Some(framer) => framer.frame(&line),
            None => Bytes::from(line),
        };

        if let Err(source) = transport.send(&payload).await {
            tracing::error!(
                error = %source,
                "Write to connection failed, discarding remaining input"
            );
            report.failure = Some(SinkError::Write {
                sink: SinkKind::Network,
                source,
            });
            break;
        }

        report.bytes_written += payload.len() as u64;
        report.writes += 1;

        if let Some(framer) = framer.as_mut() {
            framer.commit();
        }
    }

    match lines.discard_rest().await {
        Ok(n) => report.bytes_discarded += n,
        Err(e) => tracing::warn!(error = %e, "Failed to drain network sink input"),
    }
    report.dropped_partial = lines.dropped_partial();

    tracing::debug!(
        lines_sent = report.writes,
        bytes_written = report.bytes_written,
        bytes_discarded = report.bytes_discarded,
        dropped_partial = report.dropped_partial,
        "Network sink drained"
    );
    (transport, report)
}

//! Fan-out Pipeline
//!
//! One producer (the input reader) and up to two consumers (tee, network),
//! each consumer fed through its own bounded channel and running as its own
//! task.
//!
//! ```text
//!                  +--> [chan] --> tee task ------> stdout
//! stdin --> read --+
//!                  +--> [chan] --> network task --> frame --> Connection
//! ```
//!
//! Lifecycle: `Idle -> Running -> Draining -> Closed`.
//! - Running: every chunk read is handed to every live sink channel before
//!   the next read. A full channel holds the reader back.
//! - Draining: input hit end-of-stream (or a read error). All sink channels
//!   are closed and each task is joined.
//! - Closed: every sink has reported and the connection, if any, has been
//!   closed exactly once.
//!
//! With no sink at all the input is still read to the end, so an upstream
//! writer never blocks on us.

// Local crates
use crate::{
    helpers::load_config::ForwardConfig,
    pipeline::sinks::{SinkError, SinkKind, SinkReport, run_network_sink, run_tee_sink},
    syslog::framer::SyslogFramer,
    transport::connection::Transport,
};

// External crates
use bytes::Bytes;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::instrument;

/// Size of a single read from the input.
pub const READ_BUFFER_SIZE: usize = 16384;
/// Chunks a sink may have queued before the reader waits on it.
pub const SINK_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub read_buffer_size: usize,
    pub channel_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            read_buffer_size: READ_BUFFER_SIZE,
            channel_capacity: SINK_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Closed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub bytes_read: u64,
    pub tee: Option<SinkReport>,
    pub network: Option<SinkReport>,
}

/// Sending half of one sink's channel.
struct SinkInput {
    kind: SinkKind,
    tx: mpsc::Sender<Bytes>,
}

pub struct FanoutPipeline<T, W> {
    config: ForwardConfig,
    connection: Option<T>,
    tee_output: Option<W>,
    options: PipelineOptions,
    state: PipelineState,
}

impl<T, W> fmt::Debug for FanoutPipeline<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutPipeline")
            .field("config", &self.config)
            .field("connected", &self.connection.is_some())
            .field("options", &self.options)
            .field("state", &self.state)
            .finish()
    }
}

impl<T, W> FanoutPipeline<T, W>
where
    T: Transport,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// `connection` is `None` when connecting failed; the pipeline then runs
    /// without a network sink. `tee_output` is only used if `config.tee` is set.
    pub fn new(config: ForwardConfig, connection: Option<T>, tee_output: W) -> Self {
        Self {
            config,
            connection,
            tee_output: Some(tee_output),
            options: PipelineOptions::default(),
            state: PipelineState::Idle,
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    /// Consume `input` to end-of-stream, fanning it out to the active sinks,
    /// and return once every sink has drained and the connection is closed.
    ///
    /// A pipeline runs once; later calls return an empty report.
    #[instrument(
        name = "forwarder::pipeline::run",
        target = "pipeline::fanout",
        skip_all,
        fields(tee = self.config.tee, connected = self.connection.is_some()),
        level = "debug"
    )]
    pub async fn run<R>(&mut self, mut input: R) -> PipelineReport
    where
        R: AsyncRead + Unpin,
    {
        let mut report = PipelineReport::default();
        if self.state != PipelineState::Idle {
            tracing::warn!(state = %self.state, "Pipeline already ran");
            return report;
        }
        self.transition(PipelineState::Running);

        let capacity = self.options.channel_capacity.max(1);
        let mut inputs: Vec<SinkInput> = Vec::with_capacity(2);

        let mut tee_task: Option<JoinHandle<SinkReport>> = None;
        if self.config.tee {
            if let Some(out) = self.tee_output.take() {
                let (tx, rx) = mpsc::channel(capacity);
                inputs.push(SinkInput {
                    kind: SinkKind::Tee,
                    tx,
                });
                tee_task = Some(tokio::spawn(run_tee_sink(rx, out)));
            }
        }

        let mut network_task: Option<JoinHandle<(T, SinkReport)>> = None;
        if let Some(transport) = self.connection.take() {
            let (tx, rx) = mpsc::channel(capacity);
            inputs.push(SinkInput {
                kind: SinkKind::Network,
                tx,
            });
            let framer = self.config.syslog.clone().map(SyslogFramer::new);
            network_task = Some(tokio::spawn(run_network_sink(rx, transport, framer)));
        }

        tracing::debug!(sinks = inputs.len(), "Sinks started");

        report.bytes_read = if inputs.is_empty() {
            discard_input(&mut input).await
        } else {
            self.fan_out(&mut input, &mut inputs).await
        };

        self.transition(PipelineState::Draining);
        // Dropping the senders is the end-of-stream signal for each sink.
        drop(inputs);

        if let Some(task) = tee_task {
            report.tee = Some(task.await.unwrap_or_else(|e| lost_task(SinkKind::Tee, e)));
        }

        if let Some(task) = network_task {
            report.network = Some(match task.await {
                Ok((mut transport, sink_report)) => {
                    if let Err(e) = transport.close().await {
                        tracing::warn!(error = %e, "Failed to close connection cleanly");
                    }
                    sink_report
                }
                Err(e) => lost_task(SinkKind::Network, e),
            });
        }

        self.transition(PipelineState::Closed);
        tracing::debug!(bytes_read = report.bytes_read, "Pipeline closed");
        report
    }

    async fn fan_out<R>(&self, input: &mut R, inputs: &mut Vec<SinkInput>) -> u64
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = vec![0u8; self.options.read_buffer_size.max(1)];
        let mut total = 0u64;

        loop {
            let n = match input.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "Input read failed, treating as end of stream");
                    break;
                }
            };
            total += n as u64;

            let chunk = Bytes::copy_from_slice(&buffer[..n]);
            let mut gone = Vec::new();
            for (idx, sink) in inputs.iter().enumerate() {
                if sink.tx.send(chunk.clone()).await.is_err() {
                    tracing::warn!(sink = %sink.kind, "Sink task is gone, no longer feeding it");
                    gone.push(idx);
                }
            }
            for idx in gone.into_iter().rev() {
                inputs.remove(idx);
            }

            // Keep reading with nobody left to feed so the writer isn't blocked.
            if inputs.is_empty() {
                total += discard_input(input).await;
                break;
            }
        }

        total
    }
}

async fn discard_input<R>(input: &mut R) -> u64
where
    R: AsyncRead + Unpin,
{
    match tokio::io::copy(input, &mut tokio::io::sink()).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "Input read failed while discarding");
            0
        }
    }
}

fn lost_task(sink: SinkKind, err: JoinError) -> SinkReport {
    tracing::error!(%sink, error = %err, "Sink task failed before draining");
    SinkReport {
        failure: Some(SinkError::Task {
            sink,
            reason: err.to_string(),
        }),
        ..Default::default()
    }
}

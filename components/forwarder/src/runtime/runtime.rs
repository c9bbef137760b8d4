// Local crates
use crate::{
    cli::cli::print_usage,
    helpers::{destination::Destination, load_config::ForwardConfig},
    pipeline::fanout::{FanoutPipeline, PipelineReport},
    transport::connector::connect,
};

// External crates
use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::instrument;

/// Forwarder runtime: validate, connect, then run the pipeline over
/// stdin/stdout until stdin closes.
///
/// A missing or malformed destination prints usage and returns `Ok`.
pub async fn run_forwarder(config: ForwardConfig, destination: Option<&str>) -> Result<()> {
    let destination = match destination.map(Destination::parse) {
        Some(Ok(destination)) => destination,
        Some(Err(e)) => {
            tracing::debug!(error = %e, "Invalid destination, showing usage");
            return print_usage();
        }
        None => return print_usage(),
    };

    let report = forward(
        &config,
        &destination,
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await;

    tracing::info!(
        bytes_read = report.bytes_read,
        network_failed = report.network.as_ref().is_some_and(|r| r.failed()),
        tee_failed = report.tee.as_ref().is_some_and(|r| r.failed()),
        "Forwarding finished"
    );
    Ok(())
}

/// Connect to `destination` and forward `input`. A failed connection is
/// logged and the run continues without a network sink.
#[instrument(
    name = "forwarder::runtime::forward",
    target = "runtime::runtime",
    skip_all,
    fields(destination = %destination, mode = %config.mode),
    level = "debug"
)]
pub async fn forward<R, W>(
    config: &ForwardConfig,
    destination: &Destination,
    input: R,
    tee_output: W,
) -> PipelineReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let connection = match connect(destination, config.mode).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            tracing::error!("Could not connect to {destination}: {e}");
            None
        }
    };

    let mut pipeline = FanoutPipeline::new(config.clone(), connection, tee_output);
    pipeline.run(input).await
}

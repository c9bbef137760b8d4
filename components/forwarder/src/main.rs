//! `forward` binary entrypoint.

use anyhow::Result;
use forwarder::{cli, instrumentation};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::cli::parse_args();

    // The guard flushes buffered diagnostics on drop, keep it for the whole run.
    let _log_guard = instrumentation::tracing::init_tracing(args.log_json)?;
    instrumentation::tracing::init_panic_handler();

    // Main entrypoint simply delegates control to CLI layer.
    cli::cli::run(args).await
}

use clap::Parser;
use jdbfetch_core::control::CancelToken;
use jdbfetch_core::error::FetchError;
use jdbfetch_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; a read-only state dir should
    // not stop a download.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable ({:#}), logging to stderr", e);
    }

    let cli = Cli::parse();

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    if let Err(err) = cli.run(cancel).await {
        tracing::error!("{:#}", err);
        eprintln!("jdbfetch error: {:#}", err);
        std::process::exit(exit_code(&err));
    }
}

/// Distinct status per terminal failure kind; 1 for anything untyped.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<FetchError>()
        .map(FetchError::exit_code)
        .unwrap_or(1)
}

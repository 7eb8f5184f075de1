//! dotchat server binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use dotchat_server::server;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
        EnvFilter::new(format!(
            "dotchat_server={level},dotchat_common={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!(
        "Starting dotchat server v{}",
        env!("CARGO_PKG_VERSION")
    );

    match server::run(&cli.private_key, &cli.certificate) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Fatal error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

//! dotchat client binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod connection;
mod repl;

use api::ChatClient;
use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
        EnvFilter::new(format!(
            "dotchat_client={level},dotchat_common={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("An error occurred:");
            eprintln!("  {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut client = ChatClient::connect(&cli.certificate, &cli.address, cli.port)?;
    let outcome = repl::run(&mut client);
    client.close();
    Ok(outcome?)
}

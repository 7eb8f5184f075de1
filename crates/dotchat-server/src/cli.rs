//! CLI arguments for the server

use std::path::PathBuf;

use clap::Parser;

/// dotchat server - TLS-secured chat service
#[derive(Parser, Debug)]
#[command(name = "dotchat-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the private key PEM file
    pub private_key: PathBuf,

    /// Path to the certificate PEM file
    pub certificate: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

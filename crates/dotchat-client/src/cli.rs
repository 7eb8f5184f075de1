//! CLI arguments for the client

use std::path::PathBuf;

use clap::Parser;

/// dotchat client - interactive terminal client
#[derive(Parser, Debug)]
#[command(name = "dotchat-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the server certificate PEM file
    pub certificate: PathBuf,

    /// Server IP address or host name
    pub address: String,

    /// Server port number
    pub port: u16,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

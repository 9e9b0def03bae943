//! CLI argument parsing for the fieldroute-worker binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fieldroute-worker", about = "Field sales route planning worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
}

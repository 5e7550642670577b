//! gatehouse - grant-based authorization server

use clap::Parser;
use color_eyre::eyre::Result;
use gatehouse::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::HashSecret(cmd) => cmd.run(),
    }
}

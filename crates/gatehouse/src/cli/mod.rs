//! cli subcommands for gatehouse.
//!
//! - `gatehouse serve` - run the authorization server
//! - `gatehouse hash-secret` - hash an access token secret for the config file

mod hash_secret;
mod serve;

pub use hash_secret::HashSecretCommand;
pub use serve::ServeCommand;

use clap::{Parser, Subcommand};

/// gatehouse - grant-based authorization server
#[derive(Parser, Debug)]
#[command(name = "gatehouse")]
#[command(about = "Grant-based authorization server", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the authorization server
    Serve(ServeCommand),

    /// print the config hash of an access token secret
    HashSecret(HashSecretCommand),
}

//! the `hash-secret` subcommand.

use clap::Args;
use color_eyre::eyre::{Result, ensure};
use gatehouse_types::hash_secret;

/// hash an access token secret for `access_tokens[].secret_hash`
#[derive(Args, Debug)]
pub struct HashSecretCommand {
    /// the secret to hash
    #[arg(env = "GATEHOUSE_TOKEN_SECRET")]
    secret: String,
}

impl HashSecretCommand {
    /// run the hash-secret command
    pub fn run(self) -> Result<()> {
        ensure!(!self.secret.is_empty(), "secret cannot be empty");
        println!("{}", hash_secret(&self.secret));
        Ok(())
    }
}

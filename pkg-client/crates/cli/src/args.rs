use std::path::PathBuf;

use clap::{
    error::{Error, ErrorKind},
    Parser, Subcommand,
};
use data_encoding::BASE32_NOPAD;
use ed25519_dalek::VerifyingKey;

#[derive(Debug, Parser)]
#[command(about = "Client for a private key generator (PKG) server")]
pub struct Args {
    /// Client configuration file.
    #[clap(long, global = true, default_value = "client.toml")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generates a configuration with a fresh login key.
    Init {
        #[clap(long)]
        username: String,
        #[clap(long)]
        server_address: String,
        #[clap(long, value_parser = public_key_parser)]
        server_key: VerifyingKey,
    },
    /// Registers the username and login key with the server.
    Register,
    /// Proves ownership of the username.
    Verify {
        #[clap(long, value_parser = token_parser)]
        token: Token,
    },
    /// Checks that the server knows this client.
    Status,
    /// Extracts the IBE private key for a round.
    Extract {
        #[clap(long)]
        round: u32,
        #[clap(long, value_parser = public_key_parser)]
        long_term_key: VerifyingKey,
    },
}

#[derive(Debug, Clone)]
pub struct Token(pub Vec<u8>);

fn decode_base32(value: &str) -> Result<Vec<u8>, Error> {
    BASE32_NOPAD
        .decode(value.trim_end_matches('=').as_bytes())
        .map_err(|_| Error::raw(ErrorKind::InvalidValue, "Value is not valid base32!\n"))
}

fn public_key_parser(value: &str) -> Result<VerifyingKey, Error> {
    let bytes: [u8; 32] = decode_base32(value)?.try_into().map_err(|_| {
        Error::raw(
            ErrorKind::InvalidValue,
            "Public key must be exactly 32 bytes long!\n",
        )
    })?;

    VerifyingKey::from_bytes(&bytes).map_err(|_| {
        Error::raw(
            ErrorKind::InvalidValue,
            "Public key is not a valid Ed25519 point!\n",
        )
    })
}

fn token_parser(value: &str) -> Result<Token, Error> {
    decode_base32(value).map(Token)
}

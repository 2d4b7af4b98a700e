#![forbid(rust_2018_compatibility, deprecated_in_future, unsafe_code)]
#![deny(rust_2021_compatibility, warnings)]

use std::io;

use anyhow::Context as _;
use clap::Parser as _;
use data_encoding::HEXLOWER;
use ed25519_dalek::VerifyingKey;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pkg_client::{Client, ClientConfig, ExtractResult, ServerIdentity};

use self::args::{Args, Command, Token};

mod args;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

fn connect(config: ClientConfig, long_term_key: VerifyingKey) -> anyhow::Result<Client> {
    Client::new(config, long_term_key).context("Failed to set up pinned transport!")
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Args = Args::parse();

    match args.command {
        Command::Init {
            username,
            server_address,
            server_key,
        } => {
            let server: ServerIdentity = ServerIdentity::new(server_address, server_key)
                .context("Invalid server identity!")?;

            ClientConfig::generate(username, server)
                .context("Failed to generate client configuration!")?
                .save(&args.config)
                .with_context(|| format!("Failed to write {}!", args.config.display()))?;

            info!(path = %args.config.display(), "Wrote client configuration");
        }
        command => {
            let config: ClientConfig = ClientConfig::load(&args.config)
                .with_context(|| format!("Failed to load {}!", args.config.display()))?;

            run(config, command)?;
        }
    }

    Ok(())
}

fn run(config: ClientConfig, command: Command) -> anyhow::Result<()> {
    // Only extraction sends the long-term key to the server.
    let login_key: VerifyingKey = config.login_public_key();

    match command {
        Command::Init { .. } => {}
        Command::Register => {
            connect(config, login_key)?
                .register()
                .context("Registration failed!")?;

            println!("Registered.");
        }
        Command::Verify { token: Token(token) } => {
            connect(config, login_key)?
                .verify(&token)
                .context("Verification failed!")?;

            println!("Verified.");
        }
        Command::Status => {
            connect(config, login_key)?
                .check_status()
                .context("Status check failed!")?;

            println!("Registered and recognized by the server.");
        }
        Command::Extract {
            round,
            long_term_key,
        } => {
            let result: ExtractResult = connect(config, long_term_key)?
                .extract(round)
                .with_context(|| format!("Extraction for round {round} failed!"))?;

            println!(
                "private_key = {}",
                HEXLOWER.encode(&result.private_key.to_bytes())
            );
            println!(
                "identity_sig = {}",
                HEXLOWER.encode(&result.identity_sig.to_bytes())
            );
        }
    }

    Ok(())
}

#![forbid(
    rust_2018_compatibility,
    deprecated_in_future,
    unsafe_code,
    clippy::pedantic
)]
#![deny(rust_2021_compatibility, warnings)]

//! Client for a private key generator (PKG) that hands out per-round IBE
//! private keys over a channel pinned to the server's Ed25519 key.

pub use self::{
    client::Client,
    config::{ClientConfig, ConfigError},
    envelope::ExtractResult,
    error::{Error, ErrorCode, ServerError},
    ibe::{IbePrivateKey, IdentitySignature, KeyMaterialError},
    identity::ServerIdentity,
    transport::{PinnedTransport, RawReply, Transport, TransportError},
};

pub mod client;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ibe;
pub mod identity;
pub mod messages;
pub mod signing;
pub mod transport;

#[cfg(test)]
mod testing;

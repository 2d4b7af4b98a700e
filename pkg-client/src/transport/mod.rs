use std::{sync::Arc, time::Duration};

use reqwest::{
    blocking::{Client as HttpClient, ClientBuilder as HttpClientBuilder, Response},
    header::{CONNECTION, CONTENT_TYPE},
    StatusCode,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::{
    error::{Error, ServerError},
    identity::ServerIdentity,
    messages::Endpoint,
};

pub use self::pinning::{client_config, PinnedKeyVerifier};

mod pinning;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Carries one POST request to the PKG server and returns whatever came back.
///
/// Implementations report only channel failures; HTTP error statuses are
/// ordinary replies and are interpreted by [`send`].
pub trait Transport: Send + Sync {
    fn post(&self, path: &str, body: Vec<u8>) -> Result<RawReply, TransportError>;
}

impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    fn post(&self, path: &str, body: Vec<u8>) -> Result<RawReply, TransportError> {
        T::post(self, path, body)
    }
}

/// HTTPS transport pinned to the server's signing key.
///
/// Connections are never reused: every request opens a fresh, freshly
/// authenticated channel and asks the server to close it afterwards.
pub struct PinnedTransport {
    identity: ServerIdentity,
    client: HttpClient,
}

impl PinnedTransport {
    pub fn new(identity: &ServerIdentity) -> Result<Self, TransportError> {
        Self::build(identity, HttpClient::builder())
    }

    /// Same as [`PinnedTransport::new`], bounding each request by `timeout`.
    pub fn with_timeout(
        identity: &ServerIdentity,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Self::build(identity, HttpClient::builder().timeout(timeout))
    }

    fn build(
        identity: &ServerIdentity,
        builder: HttpClientBuilder,
    ) -> Result<Self, TransportError> {
        let client: HttpClient = builder
            .use_preconfigured_tls(client_config(identity.signing_key())?)
            .https_only(true)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            identity: identity.clone(),
            client,
        })
    }
}

impl Transport for PinnedTransport {
    fn post(&self, path: &str, body: Vec<u8>) -> Result<RawReply, TransportError> {
        let response: Response = self
            .client
            .post(self.identity.url(path))
            .header(CONNECTION, "close")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(TransportError::Request)?;

        let status: StatusCode = response.status();

        let body: Vec<u8> = response
            .bytes()
            .map(Vec::from)
            .map_err(TransportError::Body)?;

        Ok(RawReply { status, body })
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to set up pinned TLS configuration!")]
    Tls(#[from] rustls::Error),
    #[error("Failed to construct HTTP client!")]
    Client(#[source] reqwest::Error),
    #[error("Failed to execute request!")]
    Request(#[source] reqwest::Error),
    #[error("Failed to read response body!")]
    Body(#[source] reqwest::Error),
    /// Raw socket failure; for [`Transport`] implementations that do their
    /// own I/O instead of going through reqwest.
    #[error("Connection failed!")]
    Io(#[from] std::io::Error),
}

/// Encodes `args`, posts them to the endpoint's path and decodes the reply.
pub fn send<T, E>(transport: &T, identity: &ServerIdentity, args: &E) -> Result<E::Reply, Error>
where
    T: Transport + ?Sized,
    E: Endpoint,
{
    let body: Vec<u8> = serde_json::to_vec(args).map_err(Error::Encoding)?;

    debug!(
        endpoint = E::PATH,
        address = identity.address(),
        "Sending PKG request"
    );

    let reply: RawReply = transport
        .post(E::PATH, body)
        .map_err(|source: TransportError| Error::Transport {
            url: identity.url(E::PATH),
            source,
        })?;

    decode_reply(reply)
}

fn decode_reply<R>(reply: RawReply) -> Result<R, Error>
where
    R: DeserializeOwned,
{
    if reply.status == StatusCode::OK {
        return serde_json::from_slice(&reply.body).map_err(Error::MalformedReply);
    }

    match serde_json::from_slice::<ServerError>(&reply.body) {
        Ok(error) => Err(Error::Server(error)),
        Err(_) => Err(Error::UnparseableErrorBody {
            status: reply.status,
            body: String::from_utf8_lossy(&reply.body).into_owned(),
        }),
    }
}

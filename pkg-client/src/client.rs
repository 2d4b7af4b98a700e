use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::{
    config::ClientConfig,
    envelope::{ExtractResult, ExtractionEnvelope},
    error::Error,
    identity::ServerIdentity,
    messages::{ExtractArgs, RegisterArgs, StatusArgs, VerifyArgs},
    signing::Signed,
    transport::{self, PinnedTransport, Transport, TransportError},
};

/// Connects to a PKG server to extract IBE private keys.
///
/// Before a client can extract keys, it must register its username and login
/// key with the server, and then prove ownership of the username with
/// [`Client::verify`] unless the server runs in first-come-first-serve mode.
///
/// Every method performs exactly one blocking round trip. The client can be
/// shared between threads; all key material used by a call is generated for
/// that call alone.
pub struct Client<T = PinnedTransport> {
    identity: ServerIdentity,
    username: String,
    login_key: SigningKey,
    long_term_key: VerifyingKey,
    transport: T,
}

impl Client<PinnedTransport> {
    /// `long_term_key` is the user's long-term signing key, which the server
    /// attests to on every extraction.
    pub fn new(config: ClientConfig, long_term_key: VerifyingKey) -> Result<Self, TransportError> {
        let transport: PinnedTransport = PinnedTransport::new(&config.server)?;

        Ok(Self::with_transport(config, long_term_key, transport))
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    pub fn with_transport(config: ClientConfig, long_term_key: VerifyingKey, transport: T) -> Self {
        let ClientConfig {
            username,
            login_key,
            server,
        } = config;

        Self {
            identity: server,
            username,
            login_key,
            long_term_key,
            transport,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn login_public_key(&self) -> VerifyingKey {
        self.login_key.verifying_key()
    }

    /// Registers the username and login key. Needed once per server.
    pub fn register(&self) -> Result<(), Error> {
        let args: RegisterArgs = RegisterArgs {
            username: self.username.clone(),
            login_key: self.login_key.verifying_key(),
        };

        transport::send(&self.transport, &self.identity, &args).map(drop)
    }

    /// Proves ownership of the username with a token delivered out of band.
    pub fn verify(&self, token: &[u8]) -> Result<(), Error> {
        let request: Signed<VerifyArgs> = Signed::new(
            VerifyArgs {
                username: self.username.clone(),
                token: token.to_vec(),
            },
            &self.login_key,
        );

        transport::send(&self.transport, &self.identity, &request).map(drop)
    }

    /// Succeeds when the server recognizes this client's registration.
    pub fn check_status(&self) -> Result<(), Error> {
        let args: StatusArgs =
            StatusArgs::new(self.username.clone(), *self.identity.signing_key())?;

        let request: Signed<StatusArgs> = Signed::new(args, &self.login_key);

        transport::send(&self.transport, &self.identity, &request).map(drop)
    }

    /// Obtains the user's IBE private key for `round`.
    pub fn extract(&self, round: u32) -> Result<ExtractResult, Error> {
        let envelope: ExtractionEnvelope = ExtractionEnvelope::generate();

        let request: Signed<ExtractArgs> = Signed::new(
            ExtractArgs {
                round,
                username: self.username.clone(),
                return_key: envelope.return_key().clone(),
                user_long_term_key: self.long_term_key,
                server_signing_key: *self.identity.signing_key(),
            },
            &self.login_key,
        );

        let reply = transport::send(&self.transport, &self.identity, &request)?;

        envelope.open(request.body(), reply, self.identity.signing_key())
    }
}

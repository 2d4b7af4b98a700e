//! Request and reply bodies of the four PKG endpoints.

use crypto_box::PublicKey as BoxPublicKey;
use ed25519_dalek::VerifyingKey;
use rand_core::{OsRng, RngCore as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::signing::{Canonical, CanonicalWriter, Signed};

pub type StatusNonce = [u8; 32];

/// Ties a request body to its URL path and the reply it expects.
pub trait Endpoint: Serialize {
    const PATH: &'static str;

    type Reply: DeserializeOwned;
}

/// Plain acknowledgement returned by `register` and `verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ack(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterArgs {
    pub username: String,
    #[serde(with = "crate::codec::base64")]
    pub login_key: VerifyingKey,
}

impl Endpoint for RegisterArgs {
    const PATH: &'static str = "register";

    type Reply = Ack;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerifyArgs {
    pub username: String,
    #[serde(with = "crate::codec::base64")]
    pub token: Vec<u8>,
}

impl Canonical for VerifyArgs {
    const CONTEXT: &'static str = "PKGVerify";

    fn write_fields(&self, writer: &mut CanonicalWriter) {
        writer.str(&self.username).bytes(&self.token);
    }
}

impl Endpoint for Signed<VerifyArgs> {
    const PATH: &'static str = "verify";

    type Reply = Ack;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusArgs {
    pub username: String,
    #[serde(with = "crate::codec::base64")]
    pub server_signing_key: VerifyingKey,
    #[serde(rename = "Message", with = "crate::codec::base64")]
    pub nonce: StatusNonce,
}

impl StatusArgs {
    /// Draws a fresh nonce so no two status probes sign the same bytes.
    pub fn new(username: String, server_signing_key: VerifyingKey) -> Result<Self, rand_core::Error> {
        let mut nonce: StatusNonce = StatusNonce::default();

        OsRng.try_fill_bytes(nonce.as_mut_slice())?;

        Ok(Self {
            username,
            server_signing_key,
            nonce,
        })
    }
}

impl Canonical for StatusArgs {
    const CONTEXT: &'static str = "PKGStatus";

    fn write_fields(&self, writer: &mut CanonicalWriter) {
        writer
            .str(&self.username)
            .bytes(self.server_signing_key.as_bytes())
            .bytes(&self.nonce);
    }
}

/// Success reply of `status`; its presence is the whole answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {}

impl Endpoint for Signed<StatusArgs> {
    const PATH: &'static str = "status";

    type Reply = StatusReply;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractArgs {
    pub round: u32,
    pub username: String,
    /// Ephemeral key the server encrypts the extracted key to.
    #[serde(with = "crate::codec::base64")]
    pub return_key: BoxPublicKey,
    #[serde(with = "crate::codec::base64")]
    pub user_long_term_key: VerifyingKey,
    #[serde(with = "crate::codec::base64")]
    pub server_signing_key: VerifyingKey,
}

impl Canonical for ExtractArgs {
    const CONTEXT: &'static str = "PKGExtract";

    fn write_fields(&self, writer: &mut CanonicalWriter) {
        writer
            .u32(self.round)
            .str(&self.username)
            .bytes(self.return_key.as_bytes())
            .bytes(self.user_long_term_key.as_bytes())
            .bytes(self.server_signing_key.as_bytes());
    }
}

impl Endpoint for Signed<ExtractArgs> {
    const PATH: &'static str = "extract";

    type Reply = Signed<ExtractReply>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractReply {
    pub round: u32,
    pub username: String,
    /// Server's ephemeral public key followed by the boxed IBE key.
    #[serde(with = "crate::codec::base64")]
    pub encrypted_private_key: Vec<u8>,
    /// Compressed G2 point, left undecoded until the reply is authenticated.
    #[serde(with = "crate::codec::base64")]
    pub identity_sig: Vec<u8>,
}

impl Canonical for ExtractReply {
    const CONTEXT: &'static str = "PKGExtractReply";

    fn write_fields(&self, writer: &mut CanonicalWriter) {
        writer
            .u32(self.round)
            .str(&self.username)
            .bytes(&self.encrypted_private_key)
            .bytes(&self.identity_sig);
    }
}

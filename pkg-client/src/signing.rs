//! Canonical encodings and Ed25519 signatures over them.
//!
//! Every signed structure defines a [`Canonical`] encoding: a domain tag
//! followed by all of its fields in a fixed order. The signature itself is
//! never part of that encoding; signed wire values are [`Signed`] wrappers
//! that carry it next to the flattened fields.

use ed25519_dalek::{Signature, SignatureError, Signer as _, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

pub trait Canonical {
    /// Domain tag separating the encodings of different structures.
    const CONTEXT: &'static str;

    fn write_fields(&self, writer: &mut CanonicalWriter);

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut writer: CanonicalWriter = CanonicalWriter::new(Self::CONTEXT);

        self.write_fields(&mut writer);

        writer.into_bytes()
    }
}

/// Length-prefixed, big-endian field encoder.
pub struct CanonicalWriter {
    bytes: Vec<u8>,
}

impl CanonicalWriter {
    fn new(context: &str) -> Self {
        let mut writer: Self = Self { bytes: Vec::new() };

        writer.bytes(context.as_bytes());

        writer
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());

        self
    }

    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.bytes
            .extend_from_slice(&(value.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(value);

        self
    }

    pub fn str(&mut self, value: &str) -> &mut Self {
        self.bytes(value.as_bytes())
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[must_use]
pub fn sign(message: &[u8], key: &SigningKey) -> Signature {
    key.sign(message)
}

pub fn verify(
    message: &[u8],
    signature: &Signature,
    key: &VerifyingKey,
) -> Result<(), SignatureError> {
    key.verify_strict(message, signature)
}

/// A value together with a signature over its canonical encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signed<T> {
    #[serde(flatten)]
    body: T,
    #[serde(rename = "Signature", with = "crate::codec::base64")]
    signature: Signature,
}

impl<T> Signed<T>
where
    T: Canonical,
{
    pub fn new(body: T, key: &SigningKey) -> Self {
        let signature: Signature = sign(&body.canonical_bytes(), key);

        Self { body, signature }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(body: T, signature: Signature) -> Self {
        Self { body, signature }
    }

    /// Fields as received; nothing about them is authenticated yet.
    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn verify(&self, key: &VerifyingKey) -> Result<(), SignatureError> {
        verify(&self.body.canonical_bytes(), &self.signature, key)
    }

    pub fn into_body(self) -> T {
        self.body
    }
}

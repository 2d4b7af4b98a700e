//! The cryptographic half of key extraction.
//!
//! A reply is checked strictly in this order, stopping at the first failure:
//! round binding, username binding, ciphertext length, server signature.
//! Only a reply that passed all four is decrypted, and only then are the
//! plaintext and the identity signature decoded as curve points.

use crypto_box::{
    aead::{Aead as _, Nonce},
    PublicKey as BoxPublicKey, SalsaBox, SecretKey as BoxSecretKey,
};
use ed25519_dalek::VerifyingKey;
use rand_core::OsRng;
use tracing::warn;
use zeroize::Zeroizing;

use crate::{
    error::Error,
    ibe::{IbePrivateKey, IdentitySignature},
    messages::{ExtractArgs, ExtractReply},
    signing::Signed,
};

/// Length of the server's ephemeral public key prefix.
pub const RETURN_KEY_SIZE: usize = 32;

/// Poly1305 tag appended by the box.
pub const BOX_OVERHEAD: usize = 16;

pub const MIN_ENCRYPTED_KEY_SIZE: usize = RETURN_KEY_SIZE + BOX_OVERHEAD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractResult {
    pub private_key: IbePrivateKey,
    pub identity_sig: IdentitySignature,
}

/// Single-use key exchange state for one extraction attempt.
///
/// The box nonce is fixed at zero, which is only sound because this key pair
/// is generated per call and consumed by [`ExtractionEnvelope::open`].
pub(crate) struct ExtractionEnvelope {
    secret: BoxSecretKey,
    return_key: BoxPublicKey,
}

impl ExtractionEnvelope {
    pub(crate) fn generate() -> Self {
        let secret: BoxSecretKey = BoxSecretKey::generate(&mut OsRng);
        let return_key: BoxPublicKey = secret.public_key();

        Self { secret, return_key }
    }

    pub(crate) fn return_key(&self) -> &BoxPublicKey {
        &self.return_key
    }

    pub(crate) fn open(
        self,
        request: &ExtractArgs,
        reply: Signed<ExtractReply>,
        server_key: &VerifyingKey,
    ) -> Result<ExtractResult, Error> {
        let reply: ExtractReply = verify_reply(request, reply, server_key)?;

        let plaintext: Zeroizing<Vec<u8>> = open_box(&self.secret, &reply.encrypted_private_key)?;

        let private_key: IbePrivateKey = IbePrivateKey::from_bytes(&plaintext).map_err(|error| {
            warn!(round = request.round, %error, "PKG returned malformed key material");

            Error::MalformedKeyMaterial(error)
        })?;

        let identity_sig: IdentitySignature = IdentitySignature::from_bytes(&reply.identity_sig)
            .map_err(|error| {
                warn!(round = request.round, %error, "PKG returned malformed identity signature");

                Error::MalformedKeyMaterial(error)
            })?;

        Ok(ExtractResult {
            private_key,
            identity_sig,
        })
    }
}

/// Checks that `reply` answers `request` and was signed by the server.
fn verify_reply(
    request: &ExtractArgs,
    reply: Signed<ExtractReply>,
    server_key: &VerifyingKey,
) -> Result<ExtractReply, Error> {
    let body: &ExtractReply = reply.body();

    if body.round != request.round {
        warn!(
            expected = request.round,
            actual = body.round,
            "PKG reply is for the wrong round"
        );

        return Err(Error::RoundMismatch {
            expected: request.round,
            actual: body.round,
        });
    }

    if body.username != request.username {
        warn!(round = request.round, "PKG reply is for the wrong username");

        return Err(Error::UsernameMismatch {
            expected: request.username.clone(),
            actual: body.username.clone(),
        });
    }

    if body.encrypted_private_key.len() < MIN_ENCRYPTED_KEY_SIZE {
        warn!(
            round = request.round,
            length = body.encrypted_private_key.len(),
            "PKG reply carries a short ciphertext"
        );

        return Err(Error::ShortCiphertext {
            length: body.encrypted_private_key.len(),
        });
    }

    if let Err(error) = reply.verify(server_key) {
        warn!(round = request.round, "PKG reply signature is invalid");

        return Err(Error::InvalidSignature(error));
    }

    Ok(reply.into_body())
}

#[cfg(test)]
thread_local! {
    pub(crate) static BOX_OPEN_ATTEMPTS: std::cell::Cell<usize> = std::cell::Cell::new(0);
}

fn open_box(secret: &BoxSecretKey, encrypted: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    #[cfg(test)]
    BOX_OPEN_ATTEMPTS.with(|attempts| attempts.set(attempts.get() + 1));

    let (their_key, ciphertext): (&[u8; RETURN_KEY_SIZE], &[u8]) = encrypted
        .split_first_chunk::<RETURN_KEY_SIZE>()
        .ok_or(Error::ShortCiphertext {
            length: encrypted.len(),
        })?;

    SalsaBox::new(&BoxPublicKey::from(*their_key), secret)
        .decrypt(&Nonce::<SalsaBox>::default(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| {
            warn!("PKG reply failed box authentication");

            Error::DecryptionFailed
        })
}

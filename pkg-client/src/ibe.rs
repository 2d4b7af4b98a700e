//! Decoding of the pairing-based material a PKG hands out.
//!
//! The client never computes with these values; it only checks that they
//! decode to valid BLS12-381 points before passing them to the caller.

use blstrs::{G1Affine, G2Affine};
use thiserror::Error;

pub const IBE_PRIVATE_KEY_SIZE: usize = 48;

pub const IDENTITY_SIGNATURE_SIZE: usize = 96;

/// A user's identity private key for one round (compressed G1 point).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IbePrivateKey(G1Affine);

impl IbePrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        let bytes: &[u8; IBE_PRIVATE_KEY_SIZE] =
            bytes.try_into().map_err(|_| KeyMaterialError::Length {
                expected: IBE_PRIVATE_KEY_SIZE,
                actual: bytes.len(),
            })?;

        Option::<G1Affine>::from(G1Affine::from_compressed(bytes))
            .map(Self)
            .ok_or(KeyMaterialError::InvalidPoint)
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; IBE_PRIVATE_KEY_SIZE] {
        self.0.to_compressed()
    }

    #[must_use]
    pub fn as_point(&self) -> &G1Affine {
        &self.0
    }
}

impl From<G1Affine> for IbePrivateKey {
    fn from(point: G1Affine) -> Self {
        Self(point)
    }
}

/// The PKG's BLS attestation binding an extracted key to the user's
/// long-term signing key (compressed G2 point).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentitySignature(G2Affine);

impl IdentitySignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        let bytes: &[u8; IDENTITY_SIGNATURE_SIZE] =
            bytes.try_into().map_err(|_| KeyMaterialError::Length {
                expected: IDENTITY_SIGNATURE_SIZE,
                actual: bytes.len(),
            })?;

        Option::<G2Affine>::from(G2Affine::from_compressed(bytes))
            .map(Self)
            .ok_or(KeyMaterialError::InvalidPoint)
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; IDENTITY_SIGNATURE_SIZE] {
        self.0.to_compressed()
    }

    #[must_use]
    pub fn as_point(&self) -> &G2Affine {
        &self.0
    }
}

impl From<G2Affine> for IdentitySignature {
    fn from(point: G2Affine) -> Self {
        Self(point)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyMaterialError {
    #[error("Expected {expected} bytes of key material, got {actual}!")]
    Length { expected: usize, actual: usize },
    #[error("Key material is not a valid curve point!")]
    InvalidPoint,
}

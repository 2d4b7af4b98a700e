use std::fmt;

use ed25519_dalek::SignatureError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ibe::KeyMaterialError, transport::TransportError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error making PKG request {url:?}!")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("Failed to encode request arguments!")]
    Encoding(#[source] serde_json::Error),
    #[error("PKG server returned an error: {0}")]
    Server(#[from] ServerError),
    #[error("Error response ({status}) with unparseable body: {body:?}")]
    UnparseableErrorBody { status: StatusCode, body: String },
    #[error("Failed to decode reply from PKG server!")]
    MalformedReply(#[source] serde_json::Error),
    #[error("Expected reply for round {expected}, but got {actual}!")]
    RoundMismatch { expected: u32, actual: u32 },
    #[error("Expected reply for username {expected:?}, but got {actual:?}!")]
    UsernameMismatch { expected: String, actual: String },
    #[error("Unexpectedly short ciphertext ({length} bytes)!")]
    ShortCiphertext { length: usize },
    #[error("Invalid PKG server signature over reply!")]
    InvalidSignature(#[source] SignatureError),
    #[error("Box authentication failed!")]
    DecryptionFailed,
    #[error("Failed to decode extracted IBE private key!")]
    MalformedKeyMaterial(#[source] KeyMaterialError),
    #[error("Used PRNG has low entropy!")]
    LowEntropy(#[from] rand_core::Error),
}

/// Error body returned by the PKG server on non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
#[serde(rename_all = "PascalCase")]
pub struct ServerError {
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    DatabaseError,
    InvalidUsername,
    InvalidLoginKey,
    NotRegistered,
    NotVerified,
    AlreadyRegistered,
    RegistrationInProgress,
    SendingEmail,
    RoundNotFound,
    InvalidUserLongTermKey,
    InvalidSignature,
    InvalidToken,
    ExpiredToken,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BadRequest => "bad request",
            Self::DatabaseError => "database error",
            Self::InvalidUsername => "invalid username",
            Self::InvalidLoginKey => "invalid login key",
            Self::NotRegistered => "username not registered",
            Self::NotVerified => "username not verified",
            Self::AlreadyRegistered => "username already registered",
            Self::RegistrationInProgress => "registration in progress",
            Self::SendingEmail => "error sending verification email",
            Self::RoundNotFound => "round not found",
            Self::InvalidUserLongTermKey => "invalid user long-term key",
            Self::InvalidSignature => "invalid signature",
            Self::InvalidToken => "invalid token",
            Self::ExpiredToken => "token expired",
            Self::Unknown => "unknown error",
        })
    }
}

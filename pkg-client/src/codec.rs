//! Text encodings for binary key material.
//!
//! Request and reply bodies carry bytes as standard base64 strings, while
//! configuration files use unpadded base32. Both are exposed as `serde(with)`
//! modules over any [`WireBytes`] value.

use std::borrow::Cow;

use crypto_box::PublicKey as BoxPublicKey;
use data_encoding::Encoding;
use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use serde::{
    de::{Deserializer, Error as _},
    Deserialize as _, Serializer,
};
use zeroize::Zeroizing;

/// Values with a fixed raw byte representation.
pub trait WireBytes: Sized {
    fn to_wire(&self) -> Cow<'_, [u8]>;

    fn from_wire(bytes: &[u8]) -> Option<Self>;
}

impl WireBytes for Vec<u8> {
    fn to_wire(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        Some(bytes.to_vec())
    }
}

impl WireBytes for [u8; 32] {
    fn to_wire(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok()
    }
}

impl WireBytes for VerifyingKey {
    fn to_wire(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes().as_slice())
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        VerifyingKey::try_from(bytes).ok()
    }
}

impl WireBytes for SigningKey {
    fn to_wire(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes().as_slice())
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        let secret: Zeroizing<[u8; 32]> = Zeroizing::new(<[u8; 32]>::try_from(bytes).ok()?);

        Some(SigningKey::from_bytes(&secret))
    }
}

impl WireBytes for Signature {
    fn to_wire(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_bytes().to_vec())
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        Signature::try_from(bytes).ok()
    }
}

impl WireBytes for BoxPublicKey {
    fn to_wire(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes().as_slice())
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(BoxPublicKey::from)
    }
}

fn serialize_with<T, S>(value: &T, serializer: S, encoding: &Encoding) -> Result<S::Ok, S::Error>
where
    T: WireBytes,
    S: Serializer,
{
    let encoded: Zeroizing<String> = Zeroizing::new(encoding.encode(&value.to_wire()));

    serializer.serialize_str(&encoded)
}

fn deserialize_with<'de, T, D>(deserializer: D, encoding: &Encoding) -> Result<T, D::Error>
where
    T: WireBytes,
    D: Deserializer<'de>,
{
    let encoded: Zeroizing<String> = Zeroizing::new(String::deserialize(deserializer)?);

    let bytes: Zeroizing<Vec<u8>> = encoding
        .decode(encoded.as_bytes())
        .map(Zeroizing::new)
        .map_err(D::Error::custom)?;

    T::from_wire(&bytes).ok_or_else(|| {
        D::Error::custom(format_args!(
            "{} decoded bytes are not valid for this field",
            bytes.len()
        ))
    })
}

/// Standard padded base64, as used in request and reply bodies.
pub mod base64 {
    use serde::{Deserializer, Serializer};

    use super::WireBytes;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: WireBytes,
        S: Serializer,
    {
        super::serialize_with(value, serializer, &data_encoding::BASE64)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: WireBytes,
        D: Deserializer<'de>,
    {
        super::deserialize_with(deserializer, &data_encoding::BASE64)
    }
}

/// Unpadded base32, as used in configuration files.
pub mod base32 {
    use serde::{Deserializer, Serializer};

    use super::WireBytes;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: WireBytes,
        S: Serializer,
    {
        super::serialize_with(value, serializer, &data_encoding::BASE32_NOPAD)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: WireBytes,
        D: Deserializer<'de>,
    {
        super::deserialize_with(deserializer, &data_encoding::BASE32_NOPAD)
    }
}

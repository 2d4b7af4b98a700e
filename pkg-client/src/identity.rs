use ed25519_dalek::VerifyingKey;
use serde::{
    de::{Deserializer, Error as _},
    Deserialize, Serialize,
};

use crate::config::ConfigError;

/// Which PKG server a client talks to.
///
/// The signing key both authenticates the TLS channel and verifies every
/// extraction reply, so an identity is fixed once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerIdentity {
    address: String,
    #[serde(with = "crate::codec::base32")]
    key: VerifyingKey,
}

impl ServerIdentity {
    pub fn new(address: impl Into<String>, key: VerifyingKey) -> Result<Self, ConfigError> {
        let address: String = address.into();

        if address.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }

        if address.contains(['/', '?', '#']) || address.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidAddress(address));
        }

        Ok(Self { address, key })
    }

    /// `host:port` of the server.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn signing_key(&self) -> &VerifyingKey {
        &self.key
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("https://{}/{}", self.address, path)
    }
}

impl<'de> Deserialize<'de> for ServerIdentity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename = "ServerIdentity")]
        struct Unchecked {
            address: String,
            #[serde(with = "crate::codec::base32")]
            key: VerifyingKey,
        }

        let Unchecked { address, key }: Unchecked = Unchecked::deserialize(deserializer)?;

        Self::new(address, key).map_err(D::Error::custom)
    }
}

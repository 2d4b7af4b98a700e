use std::{fmt, fs, io, path::Path, string::FromUtf8Error};

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::identity::ServerIdentity;

/// Persisted client state.
///
/// The user's long-term key is deliberately absent: it is supplied at
/// runtime and only ever travels inside signed extraction requests.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub username: String,
    #[serde(with = "crate::codec::base32")]
    pub login_key: SigningKey,
    pub server: ServerIdentity,
}

impl ClientConfig {
    /// Creates a configuration with a freshly generated login key.
    pub fn generate(username: String, server: ServerIdentity) -> Result<Self, ConfigError> {
        let config: Self = Self {
            username,
            login_key: SigningKey::generate(&mut OsRng),
            server,
        };

        config.check()?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;

        config.check()?;

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content: Zeroizing<String> = fs::read(path)
            .map_err(ConfigError::Io)
            .and_then(|content: Vec<u8>| String::from_utf8(content).map_err(Into::into))
            .map(Zeroizing::new)?;

        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<Zeroizing<String>, ConfigError> {
        toml::to_string(self).map(Zeroizing::new).map_err(Into::into)
    }

    /// Writes the configuration, readable only by the current user on Unix.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        use io::Write as _;

        let content: Zeroizing<String> = self.to_toml()?;

        let mut options: fs::OpenOptions = fs::OpenOptions::new();

        options.write(true).create_new(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt as _;

            options.mode(0o600);
        }

        options.open(path)?.write_all(content.as_bytes())?;

        Ok(())
    }

    #[must_use]
    pub fn login_public_key(&self) -> VerifyingKey {
        self.login_key.verifying_key()
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }

        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("login_key", &self.login_public_key())
            .field("server", &self.server)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access configuration file!")]
    Io(#[from] io::Error),
    #[error("Configuration file uses encoding other than UTF-8!")]
    Encoding(#[from] FromUtf8Error),
    #[error("Failed to parse configuration!")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to render configuration!")]
    Render(#[from] toml::ser::Error),
    #[error("No username specified!")]
    EmptyUsername,
    #[error("No server address specified!")]
    EmptyAddress,
    #[error("Server address {0:?} must be a bare host and port!")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn server() -> ServerIdentity {
        ServerIdentity::new(
            "pkg.example.org:443",
            SigningKey::generate(&mut OsRng).verifying_key(),
        )
        .unwrap()
    }

    #[test]
    fn generated_config_survives_rendering() {
        let config: ClientConfig =
            ClientConfig::generate(String::from("alice@example.org"), server()).unwrap();

        let rendered: Zeroizing<String> = config.to_toml().unwrap();
        let parsed: ClientConfig = ClientConfig::from_toml(&rendered).unwrap();

        assert_eq!(parsed.username, config.username);
        assert_eq!(parsed.login_key.to_bytes(), config.login_key.to_bytes());
        assert_eq!(parsed.server, config.server);
        assert!(!rendered.contains("long_term"));
    }

    #[test]
    fn rejects_empty_username() {
        assert_matches!(
            ClientConfig::generate(String::new(), server()),
            Err(ConfigError::EmptyUsername)
        );
    }

    #[test]
    fn rejects_missing_server_table() {
        let login_key: String =
            data_encoding::BASE32_NOPAD.encode(SigningKey::generate(&mut OsRng).as_bytes());

        assert_matches!(
            ClientConfig::from_toml(&format!(
                "username = \"bob\"\nlogin_key = \"{login_key}\"\n"
            )),
            Err(ConfigError::Parse(_))
        );
    }
}

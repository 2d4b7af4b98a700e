use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use rustls::{
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{self, CryptoProvider, WebPkiSupportedAlgorithms},
    pki_types::{CertificateDer, ServerName, UnixTime},
    CertificateError, ClientConfig, DigitallySignedStruct, Error as TlsError, SignatureScheme,
};
use tracing::warn;
use x509_parser::{
    prelude::{FromDer as _, X509Certificate},
    public_key::PublicKey,
};

/// Authenticates the server by the Ed25519 key in its certificate.
///
/// Certificate authorities and host names play no part here: the end-entity
/// certificate must carry exactly the pinned key, and the handshake
/// signature made with that key proves the server holds its private half.
#[derive(Debug)]
pub struct PinnedKeyVerifier {
    key: VerifyingKey,
    algorithms: WebPkiSupportedAlgorithms,
}

impl PinnedKeyVerifier {
    #[must_use]
    pub fn new(key: VerifyingKey, provider: &CryptoProvider) -> Self {
        Self {
            key,
            algorithms: provider.signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for PinnedKeyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let Ok((_, certificate)) = X509Certificate::from_der(end_entity.as_ref()) else {
            return Err(TlsError::InvalidCertificate(CertificateError::BadEncoding));
        };

        // The parser doesn't recognize Ed25519 keys, so compare the raw bytes.
        let Ok(PublicKey::Unknown(presented)) = certificate.public_key().parsed() else {
            return Err(TlsError::InvalidCertificate(CertificateError::BadEncoding));
        };

        if presented != self.key.as_bytes().as_slice() {
            warn!("PKG server presented a certificate for an unexpected key");

            return Err(TlsError::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ));
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![SignatureScheme::ED25519]
    }
}

/// TLS client configuration that only talks to the holder of `key`.
pub fn client_config(key: &VerifyingKey) -> Result<ClientConfig, TlsError> {
    let provider: Arc<CryptoProvider> = Arc::new(crypto::ring::default_provider());

    let verifier: Arc<PinnedKeyVerifier> = Arc::new(PinnedKeyVerifier::new(*key, &provider));

    Ok(ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth())
}

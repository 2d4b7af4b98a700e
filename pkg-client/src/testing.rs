//! In-process PKG server standing in for the remote service in tests.

use std::{
    collections::HashMap,
    io,
    sync::Mutex,
};

use blstrs::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use crypto_box::{
    aead::{Aead as _, Nonce},
    PublicKey as BoxPublicKey, SalsaBox, SecretKey as BoxSecretKey,
};
use ed25519_dalek::{SigningKey, VerifyingKey};
use group::Group as _;
use rand_core::OsRng;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    error::{ErrorCode, ServerError},
    ibe::{IbePrivateKey, IdentitySignature},
    identity::ServerIdentity,
    messages::{Ack, ExtractArgs, ExtractReply, RegisterArgs, StatusArgs, StatusReply, VerifyArgs},
    signing::Signed,
    transport::{RawReply, Transport, TransportError},
};

/// Encrypts `plaintext` the way the PKG does: a fresh server key pair, the
/// zero nonce, and the server's public key prepended to the box.
pub(crate) fn seal_for(return_key: &BoxPublicKey, plaintext: &[u8]) -> Vec<u8> {
    let server_secret: BoxSecretKey = BoxSecretKey::generate(&mut OsRng);

    let ciphertext: Vec<u8> = SalsaBox::new(return_key, &server_secret)
        .encrypt(&Nonce::<SalsaBox>::default(), plaintext)
        .expect("box encryption");

    let mut sealed: Vec<u8> = server_secret.public_key().as_bytes().to_vec();
    sealed.extend_from_slice(&ciphertext);

    sealed
}

/// Ways the stub deviates from an honest server.
#[derive(Debug, Clone, Default)]
pub(crate) enum Misbehavior {
    #[default]
    None,
    NextRound,
    OtherUsername,
    ShortCiphertext,
    ForeignSignature,
    CorruptCiphertext,
    GarbageKeyMaterial,
    /// Wrong round, an off-curve identity signature and a foreign signer.
    ForgedStaleReply,
    RawError(StatusCode, &'static str),
    Unreachable,
}

pub(crate) struct StubPkg {
    signing_key: SigningKey,
    identity: ServerIdentity,
    misbehavior: Misbehavior,
    ibe_key: IbePrivateKey,
    identity_sig: IdentitySignature,
    registered: Mutex<HashMap<String, VerifyingKey>>,
    verified: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl StubPkg {
    pub(crate) fn new(misbehavior: Misbehavior) -> Self {
        let signing_key: SigningKey = SigningKey::generate(&mut OsRng);

        let identity: ServerIdentity =
            ServerIdentity::new("pkg.test:443", signing_key.verifying_key()).expect("identity");

        Self {
            signing_key,
            identity,
            misbehavior,
            ibe_key: IbePrivateKey::from(G1Affine::from(
                G1Projective::generator() * Scalar::from(1234_u64),
            )),
            identity_sig: IdentitySignature::from(G2Affine::from(
                G2Projective::generator() * Scalar::from(99_u64),
            )),
            registered: Mutex::new(HashMap::new()),
            verified: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub(crate) fn ibe_key(&self) -> IbePrivateKey {
        self.ibe_key
    }

    pub(crate) fn identity_sig(&self) -> IdentitySignature {
        self.identity_sig
    }

    pub(crate) fn preregister(&self, username: &str, login_key: VerifyingKey) {
        self.registered
            .lock()
            .unwrap()
            .insert(String::from(username), login_key);
    }

    pub(crate) fn verified_token(&self, username: &str) -> Option<Vec<u8>> {
        self.verified.lock().unwrap().get(username).cloned()
    }

    /// Bodies posted to `path`, oldest first.
    pub(crate) fn requests_to(&self, path: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(recorded, _)| recorded == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn login_key(&self, username: &str) -> Result<VerifyingKey, ServerError> {
        self.registered
            .lock()
            .unwrap()
            .get(username)
            .copied()
            .ok_or_else(|| ServerError {
                code: ErrorCode::NotRegistered,
                message: format!("{username:?} is not registered"),
            })
    }

    fn check_signed<T>(&self, request: &Signed<T>, username: &str) -> Result<(), ServerError>
    where
        T: crate::signing::Canonical,
    {
        request
            .verify(&self.login_key(username)?)
            .map_err(|_| ServerError {
                code: ErrorCode::InvalidSignature,
                message: String::from("bad login signature"),
            })
    }

    fn register(&self, args: RegisterArgs) -> Result<Ack, ServerError> {
        self.preregister(&args.username, args.login_key);

        Ok(Ack(String::from("OK")))
    }

    fn verify(&self, request: Signed<VerifyArgs>) -> Result<Ack, ServerError> {
        self.check_signed(&request, &request.body().username)?;

        let args: VerifyArgs = request.into_body();

        self.verified.lock().unwrap().insert(args.username, args.token);

        Ok(Ack(String::from("OK")))
    }

    fn status(&self, request: Signed<StatusArgs>) -> Result<StatusReply, ServerError> {
        self.check_signed(&request, &request.body().username)?;

        if request.body().server_signing_key != self.signing_key.verifying_key() {
            return Err(ServerError {
                code: ErrorCode::BadRequest,
                message: String::from("wrong server key"),
            });
        }

        Ok(StatusReply {})
    }

    fn extract(&self, request: Signed<ExtractArgs>) -> Result<Signed<ExtractReply>, ServerError> {
        self.check_signed(&request, &request.body().username)?;

        let args: ExtractArgs = request.into_body();

        let plaintext: Vec<u8> = match self.misbehavior {
            Misbehavior::GarbageKeyMaterial => vec![0xab; 48],
            _ => self.ibe_key.to_bytes().to_vec(),
        };

        let mut reply: ExtractReply = ExtractReply {
            round: args.round,
            username: args.username,
            encrypted_private_key: seal_for(&args.return_key, &plaintext),
            identity_sig: self.identity_sig.to_bytes().to_vec(),
        };

        match self.misbehavior {
            Misbehavior::NextRound => reply.round += 1,
            Misbehavior::ForgedStaleReply => {
                reply.round += 1;
                reply.identity_sig = vec![0xff; 96];
                reply.identity_sig[0] = 0x9f;
            }
            Misbehavior::OtherUsername => reply.username.push_str(".evil"),
            Misbehavior::ShortCiphertext => reply.encrypted_private_key.truncate(20),
            Misbehavior::CorruptCiphertext => {
                if let Some(last) = reply.encrypted_private_key.last_mut() {
                    *last ^= 1;
                }
            }
            _ => {}
        }

        let signer: SigningKey = match self.misbehavior {
            Misbehavior::ForeignSignature | Misbehavior::ForgedStaleReply => {
                SigningKey::generate(&mut OsRng)
            }
            _ => self.signing_key.clone(),
        };

        Ok(Signed::new(reply, &signer))
    }
}

fn handle<A, R>(body: &[u8], handler: impl FnOnce(A) -> Result<R, ServerError>) -> RawReply
where
    A: DeserializeOwned,
    R: Serialize,
{
    let outcome: Result<R, ServerError> = serde_json::from_slice(body)
        .map_err(|error| ServerError {
            code: ErrorCode::BadRequest,
            message: error.to_string(),
        })
        .and_then(handler);

    match outcome {
        Ok(reply) => RawReply {
            status: StatusCode::OK,
            body: serde_json::to_vec(&reply).expect("reply encoding"),
        },
        Err(error) => RawReply {
            status: StatusCode::BAD_REQUEST,
            body: serde_json::to_vec(&error).expect("error encoding"),
        },
    }
}

impl Transport for StubPkg {
    fn post(&self, path: &str, body: Vec<u8>) -> Result<RawReply, TransportError> {
        if let Misbehavior::Unreachable = self.misbehavior {
            return Err(TransportError::Io(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }

        self.requests.lock().unwrap().push((
            String::from(path),
            serde_json::from_slice(&body).expect("client sent invalid JSON"),
        ));

        if let Misbehavior::RawError(status, body) = &self.misbehavior {
            return Ok(RawReply {
                status: *status,
                body: body.as_bytes().to_vec(),
            });
        }

        Ok(match path {
            "register" => handle(&body, |args| self.register(args)),
            "verify" => handle(&body, |request| self.verify(request)),
            "status" => handle(&body, |request| self.status(request)),
            "extract" => handle(&body, |request| self.extract(request)),
            _ => RawReply {
                status: StatusCode::NOT_FOUND,
                body: b"404 page not found".to_vec(),
            },
        })
    }
}

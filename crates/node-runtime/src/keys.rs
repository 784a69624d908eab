//! # Node Keys
//!
//! The node signs its peer documents and blocks with one Ed25519 key pair,
//! obtained once at startup:
//!
//! 1. an explicit base58 `pair { pub, sec }` from the configuration, or
//! 2. derived from `passwd` + `salt` (Argon2id).
//!
//! Public keys are base58, signatures are hex.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::container::NodeConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("This node does not have a keypair. Use `pair` or `passwd` + `salt` in configuration.")]
    NoCredentials,

    #[error("Invalid base58 key: {0}")]
    InvalidEncoding(String),

    #[error("Invalid key length: {0} bytes")]
    InvalidLength(usize),

    #[error("Public key does not match secret key")]
    Mismatch,

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// The node's signing key.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Load an explicit base58 pair. The secret is either the 32-byte seed
    /// or the 64-byte `seed || public` form.
    pub fn from_base58(public: &str, secret: &str) -> Result<Self, KeyError> {
        let secret = decode_base58(secret)?;
        let signing = match secret.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&secret);
                SigningKey::from_bytes(&seed)
            }
            64 => {
                let mut bytes = [0u8; 64];
                bytes.copy_from_slice(&secret);
                SigningKey::from_keypair_bytes(&bytes).map_err(|_| KeyError::Mismatch)?
            }
            other => return Err(KeyError::InvalidLength(other)),
        };

        Self { signing }.matching(public)
    }

    fn matching(self, public: &str) -> Result<Self, KeyError> {
        if self.public_key() != public {
            return Err(KeyError::Mismatch);
        }
        Ok(self)
    }

    /// Key pair of a raw 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// Derive the key pair from a password and a salt.
    ///
    /// The salt is hashed first so that short salts stay acceptable to
    /// Argon2.
    pub fn from_credentials(passwd: &str, salt: &str) -> Result<Self, KeyError> {
        let params =
            Params::new(19_456, 2, 1, Some(32)).map_err(|e| KeyError::Derivation(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = Sha256::digest(salt.as_bytes());

        let mut seed = [0u8; 32];
        argon2
            .hash_password_into(passwd.as_bytes(), &salt, &mut seed)
            .map_err(|e| KeyError::Derivation(e.to_string()))?;
        Ok(Self::from_seed(seed))
    }

    /// Base58 public key.
    #[must_use]
    pub fn public_key(&self) -> String {
        bs58::encode(self.signing.verifying_key().as_bytes()).into_string()
    }

    /// Hex signature of `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode_upper(self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

fn decode_base58(value: &str) -> Result<Vec<u8>, KeyError> {
    bs58::decode(value)
        .into_vec()
        .map_err(|e| KeyError::InvalidEncoding(e.to_string()))
}

/// Check a hex signature made by the base58 `public` key.
pub fn verify(public: &str, message: &[u8], signature: &str) -> Result<(), KeyError> {
    let public = decode_base58(public)?;
    let public: [u8; 32] = public
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidLength(public.len()))?;
    let key = VerifyingKey::from_bytes(&public)
        .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
    let bytes = hex::decode(signature).map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
    let signature =
        Signature::from_slice(&bytes).map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
    key.verify(message, &signature)
        .map_err(|e| KeyError::InvalidSignature(e.to_string()))
}

/// Obtain the key pair following the configuration's priority rule.
pub fn derive_keypair(config: &NodeConfig) -> Result<KeyPair, KeyError> {
    if let Some(pair) = &config.pair {
        return KeyPair::from_base58(&pair.public, &pair.sec);
    }
    match (config.passwd.as_deref(), config.salt.as_deref()) {
        (Some(passwd), Some(salt)) if !passwd.is_empty() && !salt.is_empty() => {
            KeyPair::from_credentials(passwd, salt)
        }
        _ => Err(KeyError::NoCredentials),
    }
}

/// Reusable signing capability handed to the services.
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// Base58 public key matching the signatures.
    fn public_key(&self) -> String;

    async fn sign(&self, message: &[u8]) -> Result<String, KeyError>;
}

/// [`SignatureProvider`] over an in-memory key pair.
#[derive(Debug, Clone)]
pub struct KeyPairSigner {
    pair: KeyPair,
}

impl KeyPairSigner {
    #[must_use]
    pub fn new(pair: KeyPair) -> Self {
        Self { pair }
    }
}

#[async_trait]
impl SignatureProvider for KeyPairSigner {
    fn public_key(&self) -> String {
        self.pair.public_key()
    }

    async fn sign(&self, message: &[u8]) -> Result<String, KeyError> {
        Ok(self.pair.sign(message))
    }
}

//! Authenticated encryption of sessions for transport.
//!
//! A sealed session is an opaque URL-safe string that can sit in a cookie or
//! a file. It is `base64url(nonce || ChaCha20-Poly1305(json(session)))`,
//! keyed by an Argon2 derivation of a caller-provided secret. Any change to
//! the string, or a different secret, makes `unseal` fail.

use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use super::Session;

/// Salt for deriving the seal key. The secret carries the entropy.
const SEAL_SALT: &[u8] = b"fintrack-session-seal-v1";

const NONCE_LEN: usize = 12;

/// Poly1305 tag length
const TAG_LEN: usize = 16;

pub const MIN_SECRET_LEN: usize = 16;

/// Bytes of randomness in a generated secret
const GENERATED_SECRET_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum SealError {
    #[error("Seal secret must be at least {0} bytes")]
    SecretTooShort(usize),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Sealed session is malformed: {0}")]
    Malformed(String),

    #[error("Sealed session failed authentication")]
    Tampered,

    #[error("Session encryption failed")]
    Encryption,

    #[error("Session serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct SessionSeal {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for SessionSeal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSeal").finish_non_exhaustive()
    }
}

impl SessionSeal {
    pub fn new(secret: &str) -> Result<Self, SealError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SealError::SecretTooShort(MIN_SECRET_LEN));
        }

        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(secret.as_bytes(), SEAL_SALT, &mut key)
            .map_err(|e| SealError::KeyDerivation(e.to_string()))?;

        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        })
    }

    pub fn seal(&self, session: &Session) -> Result<String, SealError> {
        let plaintext = serde_json::to_vec(session)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
            .map_err(|_| SealError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    pub fn unseal(&self, sealed: &str) -> Result<Session, SealError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(sealed.trim())
            .map_err(|e| SealError::Malformed(e.to_string()))?;

        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(SealError::Malformed(format!("only {} bytes", bytes.len())));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SealError::Tampered)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Fresh random secret suitable for `SessionSeal::new`.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

//! Authenticated symmetric encryption with an embedded salt/nonce/iteration header.
//!
//! Wire layout of a ciphertext blob (all integers little-endian):
//!
//! ```text
//! [1: version] [1: algorithm] [4: pbkdf2 rounds] [16: salt] [12: nonce] [ciphertext || 16-byte tag]
//! ```
//!
//! The ciphertext therefore carries everything needed to decrypt it except
//! the password, matching the "carries its own salt, IV, iteration count,
//! and algorithm tag" requirement.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::{OsRng, RngCore};

use crate::error::CryptoError;
use crate::kdf;

const VERSION: u8 = 1;
const ALGORITHM_AES256GCM_PBKDF2_SHA256: u8 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 1 + 1 + 4 + SALT_LEN + NONCE_LEN;
const TAG_LEN: usize = 16;

/// Minimum possible ciphertext blob: header plus an empty-plaintext AEAD tag.
pub const MIN_CIPHERTEXT_LEN: usize = HEADER_LEN + TAG_LEN;

/// Encrypts `plaintext` under a key derived from `password`, using `rounds`
/// PBKDF2 iterations and freshly generated salt/nonce.
pub fn seal(plaintext: &[u8], password: &str, rounds: u32) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key_bytes = kdf::derive_key(password, &salt, rounds)?;
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::Encoding("encryption failed".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.push(VERSION);
    out.push(ALGORITHM_AES256GCM_PBKDF2_SHA256);
    out.extend_from_slice(&rounds.to_le_bytes());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a blob produced by [`seal`] using `password`.
///
/// Returns [`CryptoError::AuthFailed`] both for a wrong password and for a
/// tampered ciphertext — the two are indistinguishable by design.
pub fn open(blob: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < HEADER_LEN {
        return Err(CryptoError::Encoding("ciphertext shorter than header".into()));
    }
    let version = blob[0];
    let algorithm = blob[1];
    if version != VERSION || algorithm != ALGORITHM_AES256GCM_PBKDF2_SHA256 {
        return Err(CryptoError::Encoding(format!(
            "unsupported version/algorithm: {version}/{algorithm}"
        )));
    }
    let rounds = u32::from_le_bytes(blob[2..6].try_into().unwrap());
    let salt = &blob[6..6 + SALT_LEN];
    let nonce_bytes = &blob[6 + SALT_LEN..6 + SALT_LEN + NONCE_LEN];
    let ciphertext = &blob[HEADER_LEN..];

    let key_bytes = kdf::derive_key(password, salt, rounds)?;
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::AuthFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let blob = seal(b"hello vault", "correct horse", 1000).unwrap();
        let pt = open(&blob, "correct horse").unwrap();
        assert_eq!(pt, b"hello vault");
    }

    #[test]
    fn wrong_password_fails_auth() {
        let blob = seal(b"hello vault", "correct horse", 1000).unwrap();
        assert_eq!(open(&blob, "wrong password"), Err(CryptoError::AuthFailed));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let mut blob = seal(b"hello vault", "correct horse", 1000).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert_eq!(open(&blob, "correct horse"), Err(CryptoError::AuthFailed));
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let blob = seal(b"", "pw", 1000).unwrap();
        assert_eq!(blob.len(), MIN_CIPHERTEXT_LEN);
        assert_eq!(open(&blob, "pw").unwrap(), b"");
    }
}

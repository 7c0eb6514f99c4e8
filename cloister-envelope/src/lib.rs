//! Signed, compressed, password-encrypted envelope for cloister vault
//! history blobs.
//!
//! A serialized vault is `SIGNATURE || CIPHERTEXT` ([`codec`]); the
//! ciphertext is produced by [`Cryptor`] from a compressed history blob
//! ([`compress`]). Each layer is independently testable and round-trips
//! exactly on well-formed input:
//!
//! ```
//! use cloister_envelope::{Cryptor, codec, compress};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let history = "fmt 2\naid 11111111-1111-1111-1111-111111111111\n";
//! let compressed = compress::compress_text(history);
//! let ciphertext = Cryptor::encrypt_buffer(&compressed, "hunter2").await.unwrap();
//! let signed = codec::sign(&ciphertext);
//!
//! assert!(codec::is_encrypted(&signed));
//! let body = codec::strip_signature(&signed).unwrap();
//! let decrypted = Cryptor::decrypt_buffer(body, "hunter2").await.unwrap();
//! let recovered = compress::decompress_text(&decrypted).unwrap();
//! assert_eq!(recovered, history);
//! # });
//! ```

pub mod codec;
pub mod compress;
pub mod error;

mod aead;
mod kdf;

use std::sync::atomic::{AtomicU32, Ordering};

pub use codec::{detect, has_valid_signature, is_encrypted, sign, strip_signature, FormatKind, SIGNATURE};
pub use compress::{compress_text, decompress_text};
pub use error::{CodecError, CompressionError, CryptoError, EnvelopeError};
pub use kdf::MIN_DERIVATION_ROUNDS;

/// Process-wide override for the PBKDF2 iteration count. Zero means "use
/// the default". Reads and writes are atomic, per the engine's
/// process-wide-configuration requirement.
static DERIVATION_ROUNDS_OVERRIDE: AtomicU32 = AtomicU32::new(0);

const RANDOM_STRING_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Symmetric encryption, key derivation, and random-string generation.
///
/// All operations are stateless aside from the process-wide derivation
/// rounds override controlled by [`Cryptor::set_derivation_rounds`]. The
/// derivation and AEAD work is CPU-bound (a PBKDF2 pass of at least
/// [`MIN_DERIVATION_ROUNDS`] iterations), so each capability runs on a
/// blocking thread via `tokio::task::spawn_blocking` rather than inline on
/// the calling task — crypto is one of the engine's suspension points, and
/// holding an executor thread for the full derivation would defeat that.
pub struct Cryptor;

impl Cryptor {
    /// Overrides the default PBKDF2 iteration count. `0` restores the
    /// default. A nonzero override below [`MIN_DERIVATION_ROUNDS`] is
    /// clamped up to it — the floor is a security property, not a suggestion.
    pub fn set_derivation_rounds(rounds: u32) {
        DERIVATION_ROUNDS_OVERRIDE.store(rounds, Ordering::SeqCst);
    }

    /// The iteration count that will be used for the next encryption.
    pub fn derivation_rounds() -> u32 {
        let override_value = DERIVATION_ROUNDS_OVERRIDE.load(Ordering::SeqCst);
        if override_value == 0 {
            MIN_DERIVATION_ROUNDS
        } else {
            override_value.max(MIN_DERIVATION_ROUNDS)
        }
    }

    /// Encrypts UTF-8 text, returning an authenticated ciphertext blob that
    /// carries its own salt, nonce, iteration count, and algorithm tag.
    pub async fn encrypt_text(plaintext: &str, password: &str) -> Result<Vec<u8>, CryptoError> {
        let plaintext = plaintext.as_bytes().to_vec();
        let password = password.to_string();
        let rounds = Self::derivation_rounds();
        Self::spawn(move || aead::seal(&plaintext, &password, rounds)).await
    }

    /// Inverse of [`Cryptor::encrypt_text`].
    pub async fn decrypt_text(ciphertext: &[u8], password: &str) -> Result<String, CryptoError> {
        let ciphertext = ciphertext.to_vec();
        let password = password.to_string();
        let plaintext = Self::spawn(move || aead::open(&ciphertext, &password)).await?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    /// Encrypts an arbitrary byte buffer (used for attachments and for the
    /// engine's compressed history blob, which is not valid UTF-8).
    pub async fn encrypt_buffer(bytes: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        let bytes = bytes.to_vec();
        let password = password.to_string();
        let rounds = Self::derivation_rounds();
        Self::spawn(move || aead::seal(&bytes, &password, rounds)).await
    }

    /// Inverse of [`Cryptor::encrypt_buffer`].
    pub async fn decrypt_buffer(ciphertext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = ciphertext.to_vec();
        let password = password.to_string();
        Self::spawn(move || aead::open(&ciphertext, &password)).await
    }

    /// A cryptographically random string of `len` characters drawn from
    /// `A-Za-z0-9`. Cheap enough (no derivation) to stay synchronous.
    pub fn random_string(len: usize) -> String {
        use rand_core::{OsRng, RngCore};
        let mut rng = OsRng;
        let mut out = String::with_capacity(len);
        // Rejection sampling avoids modulo bias against the 64-char alphabet.
        let mut buf = [0u8; 1];
        while out.len() < len {
            rng.fill_bytes(&mut buf);
            let v = buf[0];
            if (v as usize) < (256 / RANDOM_STRING_ALPHABET.len()) * RANDOM_STRING_ALPHABET.len() {
                out.push(RANDOM_STRING_ALPHABET[v as usize % RANDOM_STRING_ALPHABET.len()] as char);
            }
        }
        out
    }

    async fn spawn<F>(f: F) -> Result<Vec<u8>, CryptoError>
    where
        F: FnOnce() -> Result<Vec<u8>, CryptoError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.map_err(|e| CryptoError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decrypt_of_encrypt_is_identity() {
        let pt = "the quick brown fox";
        let ct = Cryptor::encrypt_text(pt, "swordfish").await.unwrap();
        assert_eq!(Cryptor::decrypt_text(&ct, "swordfish").await.unwrap(), pt);
    }

    #[test]
    fn random_string_has_requested_length_and_alphabet() {
        let s = Cryptor::random_string(48);
        assert_eq!(s.len(), 48);
        assert!(s.bytes().all(|b| RANDOM_STRING_ALPHABET.contains(&b)));
    }

    #[test]
    fn derivation_rounds_override_is_clamped_to_minimum() {
        Cryptor::set_derivation_rounds(10);
        assert_eq!(Cryptor::derivation_rounds(), MIN_DERIVATION_ROUNDS);
        Cryptor::set_derivation_rounds(0);
        assert_eq!(Cryptor::derivation_rounds(), MIN_DERIVATION_ROUNDS);
        Cryptor::set_derivation_rounds(500_000);
        assert_eq!(Cryptor::derivation_rounds(), 500_000);
        Cryptor::set_derivation_rounds(0);
    }

    #[tokio::test]
    async fn full_envelope_round_trip() {
        let history = "fmt 2\naid abc\n";
        let compressed = compress_text(history);
        let ciphertext = Cryptor::encrypt_buffer(&compressed, "pw").await.unwrap();
        let signed = sign(&ciphertext);
        assert!(is_encrypted(&signed));
        let body = strip_signature(&signed).unwrap();
        let decrypted = Cryptor::decrypt_buffer(body, "pw").await.unwrap();
        assert_eq!(decompress_text(&decrypted).unwrap(), history);
    }
}

//! Password-based key derivation (PBKDF2-HMAC-SHA256).

use hmac::Hmac;
use sha2::Sha256;

use crate::error::CryptoError;

/// Minimum iteration count; an override below this is clamped up to it.
pub const MIN_DERIVATION_ROUNDS: u32 = 250_000;

/// Derives a 32-byte AES-256 key from `password` and `salt`.
pub fn derive_key(password: &str, salt: &[u8], rounds: u32) -> Result<[u8; 32], CryptoError> {
    if rounds == 0 {
        return Err(CryptoError::KeyDerivation("iteration count must be nonzero".into()));
    }
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, rounds, &mut key)
        .map_err(|_| CryptoError::KeyDerivation("pbkdf2 output length invalid".into()))?;
    Ok(key)
}

//! Error taxonomy for the envelope layer: codec, crypto, compression.

use std::fmt;

/// Envelope signature/framing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Input is shorter than the signature or the signature bytes don't match.
    MissingSignature,
    /// Signature present but does not identify a recognized format.
    UnknownFormat,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MissingSignature => write!(f, "missing or malformed envelope signature"),
            CodecError::UnknownFormat => write!(f, "unrecognized envelope format"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Symmetric encryption/decryption failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext failed authentication. Covers tampered ciphertext and a wrong
    /// password alike — the two are not distinguishable by design.
    AuthFailed,
    /// Key derivation could not proceed (e.g. zero iteration count after an
    /// invalid override).
    KeyDerivation(String),
    /// Ciphertext header is malformed (too short, unknown version/algorithm).
    Encoding(String),
    /// The blocking task carrying out the derivation/AEAD work panicked or
    /// was cancelled before it could produce a result.
    TaskFailed(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::AuthFailed => write!(f, "decryption authentication failed"),
            CryptoError::KeyDerivation(msg) => write!(f, "key derivation failed: {msg}"),
            CryptoError::Encoding(msg) => write!(f, "malformed ciphertext: {msg}"),
            CryptoError::TaskFailed(msg) => write!(f, "crypto task failed: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Compression/decompression failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionError {
    /// Compressed blob is truncated or its header is invalid.
    Corrupt(String),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::Corrupt(msg) => write!(f, "corrupt compressed blob: {msg}"),
        }
    }
}

impl std::error::Error for CompressionError {}

/// Top-level error for the envelope crate's public operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    Codec(CodecError),
    Crypto(CryptoError),
    Compression(CompressionError),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::Codec(e) => write!(f, "{e}"),
            EnvelopeError::Crypto(e) => write!(f, "{e}"),
            EnvelopeError::Compression(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnvelopeError::Codec(e) => Some(e),
            EnvelopeError::Crypto(e) => Some(e),
            EnvelopeError::Compression(e) => Some(e),
        }
    }
}

impl From<CodecError> for EnvelopeError {
    fn from(e: CodecError) -> Self {
        EnvelopeError::Codec(e)
    }
}

impl From<CryptoError> for EnvelopeError {
    fn from(e: CryptoError) -> Self {
        EnvelopeError::Crypto(e)
    }
}

impl From<CompressionError> for EnvelopeError {
    fn from(e: CompressionError) -> Self {
        EnvelopeError::Compression(e)
    }
}

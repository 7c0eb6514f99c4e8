//! Deterministic byte-preserving compression of history text blobs.
//!
//! The contract this module fills (see the design notes on the
//! compression plug-point) is just "round-trips exactly"; the algorithm
//! itself is an implementation choice, not part of the engine's contract.

use crate::error::CompressionError;

/// Compresses UTF-8 text into an opaque byte blob.
pub fn compress_text(text: &str) -> Vec<u8> {
    lz4_flex::compress_prepend_size(text.as_bytes())
}

/// Inverse of [`compress_text`].
pub fn decompress_text(blob: &[u8]) -> Result<String, CompressionError> {
    let bytes = lz4_flex::decompress_size_prepended(blob)
        .map_err(|e| CompressionError::Corrupt(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CompressionError::Corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_text() {
        let text = "fmt 2\naid abc-def\npad xyz\n";
        let blob = compress_text(text);
        assert_eq!(decompress_text(&blob).unwrap(), text);
    }

    #[test]
    fn round_trip_empty() {
        let blob = compress_text("");
        assert_eq!(decompress_text(&blob).unwrap(), "");
    }

    #[test]
    fn corrupt_blob_rejected() {
        assert!(decompress_text(b"\x01\x02").is_err());
    }
}

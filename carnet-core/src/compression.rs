/*!
Compression of snapshot documents.

Archived documents are gzip-compressed before they reach a blob store. The
trait keeps the archive index decoupled from the algorithm.
*/

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};

use crate::{BackupError, Result};

/// Compression abstraction for snapshot payloads.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>>;

    /// Short algorithm label, recorded in logs
    fn algorithm_name(&self) -> &str;
}

/// Gzip compressor, the default for both variants.
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    /// Create a compressor with the default level (6)
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Create a compressor with an explicit level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .map_err(|e| BackupError::compression(format!("failed to compress document: {e}")))?;
        encoder
            .finish()
            .map_err(|e| BackupError::compression(format!("failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(compressed);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| BackupError::compression(format!("failed to decompress document: {e}")))?;
        Ok(out)
    }

    fn algorithm_name(&self) -> &str {
        "gzip"
    }
}

/// Pass-through compressor for tests.
#[derive(Debug, Clone, Default)]
pub struct NoCompression;

impl NoCompression {
    pub fn new() -> Self {
        Self
    }
}

impl Compressor for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed.to_vec())
    }

    fn algorithm_name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_roundtrip() {
        let compressor = GzipCompressor::new();
        let original = br#"{"collections":{"students":[]}}"#.repeat(20);

        let compressed = compressor.compress(&original).unwrap();
        assert!(compressed.len() < original.len());

        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_gzip_rejects_garbage() {
        let compressor = GzipCompressor::new();
        let result = compressor.decompress(b"not a gzip stream");
        assert!(matches!(result, Err(BackupError::Compression(_))));
    }

    #[test]
    fn test_no_compression_passthrough() {
        let compressor = NoCompression::new();
        let data = b"document bytes";
        assert_eq!(compressor.compress(data).unwrap(), data);
        assert_eq!(compressor.decompress(data).unwrap(), data);
        assert_eq!(compressor.algorithm_name(), "none");
    }
}

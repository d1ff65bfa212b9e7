//! Zstandard block codec (§4.G tag `d`/`D`), via `zstd`'s bulk API.

use super::Codec;
use crate::error::{Error, Result};

/// Zstd codec at a fixed compression level.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    /// `level` follows zstd's own range, roughly 1 (fastest) to 22 (best).
    pub fn new(level: i32) -> Self {
        ZstdCodec { level }
    }
}

impl Codec for ZstdCodec {
    fn max_input_size(&self) -> u64 {
        u32::MAX as u64
    }

    fn min_output_buffer_for(&self, input_size: usize) -> usize {
        zstd::zstd_safe::compress_bound(input_size)
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let compressed = zstd::bulk::compress(input, self.level)
            .map_err(|e| Error::data(format!("zstd compression failed: {e}")))?;
        if compressed.len() > output.len() {
            return Err(Error::data("zstd compression output buffer too small"));
        }
        output[..compressed.len()].copy_from_slice(&compressed);
        Ok(compressed.len())
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let decompressed = zstd::bulk::decompress(input, output.len())
            .map_err(|e| Error::data(format!("zstd decompression failed (corrupted data): {e}")))?;
        if decompressed.len() > output.len() {
            return Err(Error::data("zstd decompression output buffer too small"));
        }
        output[..decompressed.len()].copy_from_slice(&decompressed);
        Ok(decompressed.len())
    }

    fn clone_box(&self) -> Box<dyn Codec> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text() {
        let codec = ZstdCodec::new(3);
        let input = b"the quick brown fox jumps over the lazy dog".repeat(16);
        let mut mid = vec![0u8; codec.min_output_buffer_for(input.len())];
        let n = codec.compress(&input, &mut mid).unwrap();
        assert!(n < input.len());
        let mut out = vec![0u8; input.len()];
        let m = codec.decompress(&mid[..n], &mut out).unwrap();
        assert_eq!(&out[..m], &input[..]);
    }
}

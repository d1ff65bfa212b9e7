//! BZip2 block codec (§4.G tag `y`/`Y`), via the `bzip2` crate.

use std::io::Write as _;

use bzip2::Compression;
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;

use super::Codec;
use crate::error::{Error, Result};

/// BZip2 codec at a fixed compression level (1..=9, block size in 100 KiB
/// units).
#[derive(Debug, Clone, Copy)]
pub struct Bzip2Codec {
    level: u32,
}

impl Bzip2Codec {
    /// `level` is clamped to bzip2's 1..=9 range.
    pub fn new(level: u32) -> Self {
        Bzip2Codec { level: level.clamp(1, 9) }
    }
}

impl Codec for Bzip2Codec {
    fn max_input_size(&self) -> u64 {
        u32::MAX as u64
    }

    fn min_output_buffer_for(&self, input_size: usize) -> usize {
        // bzip2 can expand pathological input by roughly 1% plus a small
        // constant; double the input as a comfortable upper bound.
        input_size * 2 + 1024
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(input)
            .map_err(|e| Error::data(format!("bzip2 compression failed: {e}")))?;
        let compressed = encoder
            .finish()
            .map_err(|e| Error::data(format!("bzip2 compression failed: {e}")))?;
        if compressed.len() > output.len() {
            return Err(Error::data("bzip2 compression output buffer too small"));
        }
        output[..compressed.len()].copy_from_slice(&compressed);
        Ok(compressed.len())
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        use std::io::Read as _;
        let mut decoder = BzDecoder::new(input);
        let mut decompressed = Vec::with_capacity(output.len());
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| Error::data(format!("bzip2 decompression failed (corrupted data): {e}")))?;
        if decompressed.len() > output.len() {
            return Err(Error::data("bzip2 decompression output buffer too small"));
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
        let codec = Bzip2Codec::new(9);
        let input = b"the quick brown fox jumps over the lazy dog".repeat(16);
        let mut mid = vec![0u8; codec.min_output_buffer_for(input.len())];
        let n = codec.compress(&input, &mut mid).unwrap();
        assert!(n < input.len());
        let mut out = vec![0u8; input.len()];
        let m = codec.decompress(&mid[..n], &mut out).unwrap();
        assert_eq!(&out[..m], &input[..]);
    }
}

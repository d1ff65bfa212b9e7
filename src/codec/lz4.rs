//! LZ4 block codec (§4.G tag `q`/`Q`), via `lz4_flex`'s raw block API.

use lz4_flex::block::{compress_into, decompress_into, get_maximum_output_size};

use super::Codec;
use crate::error::{Error, Result};

/// LZ4 block codec. LZ4 has no per-call "level" in the raw block API; speed
/// is controlled by block size upstream, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Lz4Codec {
    /// Construct the codec. There is nothing to configure.
    pub fn new() -> Self {
        Lz4Codec
    }
}

impl Codec for Lz4Codec {
    fn max_input_size(&self) -> u64 {
        u32::MAX as u64
    }

    fn min_output_buffer_for(&self, input_size: usize) -> usize {
        get_maximum_output_size(input_size)
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        compress_into(input, output).map_err(|e| Error::data(format!("lz4 compression failed: {e}")))
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        decompress_into(input, output)
            .map_err(|e| Error::data(format!("lz4 decompression failed (corrupted data): {e}")))
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
        let codec = Lz4Codec::new();
        let input = b"the quick brown fox jumps over the lazy dog".repeat(16);
        let mut mid = vec![0u8; codec.min_output_buffer_for(input.len())];
        let n = codec.compress(&input, &mut mid).unwrap();
        let mut out = vec![0u8; input.len()];
        let m = codec.decompress(&mid[..n], &mut out).unwrap();
        assert_eq!(&out[..m], &input[..]);
    }
}

//! Deflate/zlib block codec (§4.G tag `z`/`Z`), via `flate2`.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use super::Codec;
use crate::error::{Error, Result};

/// Deflate codec at a fixed compression level.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: u32,
}

impl DeflateCodec {
    /// Level is the zlib compression level (0 = store, 9 = best).
    pub fn new(level: u32) -> Self {
        DeflateCodec { level: level.min(9) }
    }
}

impl Codec for DeflateCodec {
    fn max_input_size(&self) -> u64 {
        u32::MAX as u64
    }

    fn min_output_buffer_for(&self, input_size: usize) -> usize {
        // zlib's documented worst-case expansion: input plus ~0.1% plus a
        // fixed constant, rounded well up to stay safely inside it.
        input_size + input_size / 1000 + 128
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let mut compress = Compress::new(Compression::new(self.level), false);
        compress
            .compress(input, output, FlushCompress::Finish)
            .map_err(|e| Error::data(format!("deflate compression failed: {e}")))?;
        Ok(compress.total_out() as usize)
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let mut decompress = Decompress::new(false);
        let status = decompress
            .decompress(input, output, FlushDecompress::Finish)
            .map_err(|e| Error::data(format!("deflate decompression failed: {e}")))?;
        if status == Status::BufError {
            return Err(Error::data("deflate decompression output buffer too small"));
        }
        Ok(decompress.total_out() as usize)
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
        let codec = DeflateCodec::new(6);
        let input = b"the quick brown fox jumps over the lazy dog".repeat(16);
        let mut mid = vec![0u8; codec.min_output_buffer_for(input.len())];
        let n = codec.compress(&input, &mut mid).unwrap();
        assert!(n < input.len());
        let mut out = vec![0u8; input.len()];
        let m = codec.decompress(&mid[..n], &mut out).unwrap();
        assert_eq!(&out[..m], &input[..]);
    }
}

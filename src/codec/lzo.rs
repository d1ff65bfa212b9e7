//! LZO block codec (§4.G tags `l`/`L`, `j`/`J`, `k`/`K`), via `minilzo-rs`.
//!
//! `minilzo-rs` binds the reference `minilzo` library, which implements a
//! single algorithm (LZO1X-1). The archive header still distinguishes the
//! three historical LZO tags (`lzo`, `lzo1x_1_15`, `lzo1x_1`); this codec
//! accepts all three as the variant it was constructed with and compresses
//! identically for each, recording only which tag to emit. See DESIGN.md.

use super::Codec;
use crate::error::{Error, Result};

/// Which of the three archive-header LZO tags this codec stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzoVariant {
    /// `l`/`L` — the default LZO variant.
    Lzo1x1_11,
    /// `j`/`J` — LZO1X-1-15.
    Lzo1x1_15,
    /// `k`/`K` — LZO1X-1, the fastest variant.
    Lzo1x1,
}

/// LZO codec. Compression level is not configurable: `minilzo` only
/// implements its single fastest-compression mode.
#[derive(Debug, Clone, Copy)]
pub struct LzoCodec {
    variant: LzoVariant,
}

impl LzoCodec {
    /// Construct a codec for the given LZO tag variant.
    pub fn new(variant: LzoVariant) -> Self {
        LzoCodec { variant }
    }

    /// Which variant this codec was constructed with.
    pub fn variant(&self) -> LzoVariant {
        self.variant
    }
}

impl Codec for LzoCodec {
    fn max_input_size(&self) -> u64 {
        u32::MAX as u64
    }

    fn min_output_buffer_for(&self, input_size: usize) -> usize {
        // minilzo's documented worst case: input plus input/16 plus 64 plus 3.
        input_size + input_size / 16 + 64 + 3
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let compressed = minilzo::compress(input)
            .map_err(|e| Error::data(format!("lzo compression failed: {e:?}")))?;
        if compressed.len() > output.len() {
            return Err(Error::data("lzo compression output buffer too small"));
        }
        output[..compressed.len()].copy_from_slice(&compressed);
        Ok(compressed.len())
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let decompressed = minilzo::decompress(input, output.len())
            .map_err(|e| Error::data(format!("lzo decompression failed (corrupted data): {e:?}")))?;
        if decompressed.len() > output.len() {
            return Err(Error::data("lzo decompression output buffer too small"));
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
        for variant in [LzoVariant::Lzo1x1_11, LzoVariant::Lzo1x1_15, LzoVariant::Lzo1x1] {
            let codec = LzoCodec::new(variant);
            let input = b"the quick brown fox jumps over the lazy dog".repeat(16);
            let mut mid = vec![0u8; codec.min_output_buffer_for(input.len())];
            let n = codec.compress(&input, &mut mid).unwrap();
            let mut out = vec![0u8; input.len()];
            let m = codec.decompress(&mid[..n], &mut out).unwrap();
            assert_eq!(&out[..m], &input[..]);
        }
    }
}

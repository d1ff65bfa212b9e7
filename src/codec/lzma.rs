//! XZ/LZMA block codec (§4.G tag `x`/`X`), via `lzma_rust2`'s LZMA2 framing.
//!
//! LZMA2 is self-delimiting (it carries its own end-of-stream marker), so a
//! block only needs its properties byte (dictionary size) alongside the
//! compressed bytes; this codec keeps that byte as part of its own output
//! rather than threading it through the archive header separately.

use std::io::{Read as _, Write as _};

use lzma_rust2::{Lzma2Decoder, Lzma2Encoder, Lzma2EncoderOptions};

use super::Codec;
use crate::error::{Error, Result};

/// LZMA2 codec at a fixed preset level (0..=9, matching `xz`'s own scale).
#[derive(Debug, Clone, Copy)]
pub struct LzmaCodec {
    preset: u32,
}

impl LzmaCodec {
    /// `preset` is clamped to 0..=9.
    pub fn new(preset: u32) -> Self {
        LzmaCodec { preset: preset.min(9) }
    }

    fn options(&self) -> Lzma2EncoderOptions {
        Lzma2EncoderOptions::with_preset(self.preset)
    }
}

impl Codec for LzmaCodec {
    fn max_input_size(&self) -> u64 {
        u32::MAX as u64
    }

    fn min_output_buffer_for(&self, input_size: usize) -> usize {
        // LZMA2 worst case is bounded by the number of uncompressible
        // chunks it falls back to plus their small per-chunk headers.
        input_size + input_size / 64 + 1024
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let options = self.options();
        let properties = options.properties();
        let mut compressed = Vec::with_capacity(properties.len() + input.len() / 2 + 64);
        compressed.extend_from_slice(&properties);
        {
            let mut encoder = Lzma2Encoder::new(&mut compressed, &options);
            encoder
                .write_all(input)
                .map_err(|e| Error::data(format!("lzma compression failed: {e}")))?;
            encoder
                .try_finish()
                .map_err(|e| Error::data(format!("lzma compression failed: {e}")))?;
        }
        if compressed.len() > output.len() {
            return Err(Error::data("lzma compression output buffer too small"));
        }
        output[..compressed.len()].copy_from_slice(&compressed);
        Ok(compressed.len())
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let properties_len = self.options().properties().len();
        if input.len() < properties_len {
            return Err(Error::data("lzma block shorter than its properties header"));
        }
        let (properties, body) = input.split_at(properties_len);
        let mut decoder = Lzma2Decoder::new(body, properties)
            .map_err(|e| Error::data(format!("lzma decompression failed (corrupted data): {e}")))?;
        let mut decompressed = Vec::with_capacity(output.len());
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| Error::data(format!("lzma decompression failed (corrupted data): {e}")))?;
        if decompressed.len() > output.len() {
            return Err(Error::data("lzma decompression output buffer too small"));
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
        let codec = LzmaCodec::new(6);
        let input = b"the quick brown fox jumps over the lazy dog".repeat(16);
        let mut mid = vec![0u8; codec.min_output_buffer_for(input.len())];
        let n = codec.compress(&input, &mut mid).unwrap();
        let mut out = vec![0u8; input.len()];
        let m = codec.decompress(&mid[..n], &mut out).unwrap();
        assert_eq!(&out[..m], &input[..]);
    }
}

//! The `none` codec: bytes pass through unchanged (§4.G tag `n`/`N`).

use super::Codec;
use crate::error::Result;

/// Identity codec used when compression is disabled or explicitly
/// suspended (§4.H `suspend_compression`/`resume_compression`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyCodec;

impl Codec for CopyCodec {
    fn max_input_size(&self) -> u64 {
        u64::MAX
    }

    fn min_output_buffer_for(&self, input_size: usize) -> usize {
        input_size
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        output[..input.len()].copy_from_slice(input);
        Ok(input.len())
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        output[..input.len()].copy_from_slice(input);
        Ok(input.len())
    }

    fn clone_box(&self) -> Box<dyn Codec> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let codec = CopyCodec;
        let input = b"the quick brown fox";
        let mut mid = vec![0u8; codec.min_output_buffer_for(input.len())];
        let n = codec.compress(input, &mut mid).unwrap();
        let mut out = vec![0u8; input.len()];
        let m = codec.decompress(&mid[..n], &mut out).unwrap();
        assert_eq!(&out[..m], input);
    }
}

//! Pluggable block compression codec (§4.G).
//!
//! A [`Codec`] is stateless per call: `compress`/`decompress` take a whole
//! input buffer and a pre-sized output buffer and run to completion without
//! retaining state between calls. This is the primitive both the per-block
//! mode of the streaming compressor ([`crate::codec::stream`]) and the
//! parallel compressor ([`crate::parallel`]) build on: a block is a unit of
//! work that can be handed to any worker without coordinating with its
//! neighbors.
//!
//! Algorithms are named with the single-letter tags the archive header
//! uses (§4.G, §6): lowercase for the streaming/per-block-in-sequence mode
//! a [`crate::codec::stream::CompressorStream`] writes, uppercase for the
//! fully independent per-block mode the parallel compressor writes. Both
//! modes call through the same [`Codec`] implementations; the case only
//! affects how the header records which pipeline produced the body.

pub mod copy;
pub mod stream;

#[cfg(feature = "deflate")]
pub mod deflate;

#[cfg(feature = "bzip2")]
pub mod bzip2;

#[cfg(feature = "lzma")]
pub mod lzma;

#[cfg(feature = "zstd")]
pub mod zstd;

#[cfg(feature = "lz4")]
pub mod lz4;

#[cfg(feature = "lzo")]
pub mod lzo;

use crate::error::{Error, Result};

/// A stateless block compression codec (§4.G).
///
/// Every method is pure with respect to `self`: two calls with the same
/// input and the same codec configuration (level, dictionary size) produce
/// the same output. This is what lets the parallel compressor (§4.I) run
/// many blocks through `clone_box()`-ed codecs concurrently and still match
/// the sequential compressor byte-for-byte.
pub trait Codec: Send + Sync {
    /// Largest input a single `compress` call accepts. Callers chunk larger
    /// streams into blocks of at most this size before calling in.
    fn max_input_size(&self) -> u64;

    /// Smallest output buffer guaranteed to hold the compressed form of an
    /// input of `input_size` bytes, including any worst-case expansion.
    fn min_output_buffer_for(&self, input_size: usize) -> usize;

    /// Compress `input` into `output`, returning the number of bytes
    /// written. `output` must be at least [`Codec::min_output_buffer_for`]
    /// bytes for `input.len()`.
    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Decompress `input` into `output`, returning the number of bytes
    /// written. Corrupted input fails with [`Error::data`]; an `output`
    /// buffer too small to hold the decompressed form also fails with
    /// [`Error::data`], distinguishable only by message from corruption
    /// per §4.G (both are recorded as the same error kind; a richer split
    /// would need the underlying codec crate to report it, which not all
    /// of them do).
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Clone this codec's configuration into a fresh, independently owned
    /// instance, for handing to another worker thread.
    fn clone_box(&self) -> Box<dyn Codec>;
}

impl Clone for Box<dyn Codec> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Compression mode a tag is recorded under: streaming (lowercase, §4.H,
/// blocks compressed in sequence by one thread) or per-block (uppercase,
/// §4.I, blocks compressed independently and possibly out of order before
/// being re-sorted at the gather side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// Streaming/sequential mode — lowercase tag.
    Stream,
    /// Per-block/parallel mode — uppercase tag.
    Block,
}

/// Compression algorithm, named by the archive-header tag of §4.G.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// No compression; bytes pass through unchanged.
    None,
    /// Deflate/zlib (`gzip` in dar's own vocabulary).
    Gzip,
    /// BZip2.
    Bzip2,
    /// LZO, default variant.
    Lzo,
    /// XZ/LZMA.
    Xz,
    /// Zstandard.
    Zstd,
    /// LZ4.
    Lz4,
    /// LZO1X-1-15 (faster, slightly worse ratio than the default LZO variant).
    Lzo1x1_15,
    /// LZO1X-1 (fastest LZO variant).
    Lzo1x1,
}

impl Algorithm {
    /// The archive-header tag for this algorithm under `mode`.
    pub fn tag(self, mode: TagMode) -> char {
        let lower = match self {
            Algorithm::None => 'n',
            Algorithm::Gzip => 'z',
            Algorithm::Bzip2 => 'y',
            Algorithm::Lzo => 'l',
            Algorithm::Xz => 'x',
            Algorithm::Zstd => 'd',
            Algorithm::Lz4 => 'q',
            Algorithm::Lzo1x1_15 => 'j',
            Algorithm::Lzo1x1 => 'k',
        };
        match mode {
            TagMode::Stream => lower,
            TagMode::Block => lower.to_ascii_uppercase(),
        }
    }

    /// Parse an archive-header tag, returning the algorithm and the mode
    /// its case encodes.
    pub fn from_tag(tag: char) -> Result<(Self, TagMode)> {
        let mode = if tag.is_ascii_uppercase() { TagMode::Block } else { TagMode::Stream };
        let algorithm = match tag.to_ascii_lowercase() {
            'n' => Algorithm::None,
            'z' => Algorithm::Gzip,
            'y' => Algorithm::Bzip2,
            'l' => Algorithm::Lzo,
            'x' => Algorithm::Xz,
            'd' => Algorithm::Zstd,
            'q' => Algorithm::Lz4,
            'j' => Algorithm::Lzo1x1_15,
            'k' => Algorithm::Lzo1x1,
            other => return Err(Error::data(format!("unknown compression tag '{other}'"))),
        };
        Ok((algorithm, mode))
    }

    /// Build a fresh [`Codec`] for this algorithm at the given compression
    /// `level` (meaning is codec-specific; 0 is "fastest", higher is
    /// "smaller"). Fails with [`Error::feature_unavailable`] if the crate
    /// feature backing this algorithm wasn't compiled in.
    pub fn block_codec(self, level: u32) -> Result<Box<dyn Codec>> {
        match self {
            Algorithm::None => Ok(Box::new(copy::CopyCodec)),
            #[cfg(feature = "deflate")]
            Algorithm::Gzip => Ok(Box::new(deflate::DeflateCodec::new(level))),
            #[cfg(not(feature = "deflate"))]
            Algorithm::Gzip => Err(Error::feature_unavailable("deflate compression not compiled in")),
            #[cfg(feature = "bzip2")]
            Algorithm::Bzip2 => Ok(Box::new(bzip2::Bzip2Codec::new(level))),
            #[cfg(not(feature = "bzip2"))]
            Algorithm::Bzip2 => Err(Error::feature_unavailable("bzip2 compression not compiled in")),
            #[cfg(feature = "lzo")]
            Algorithm::Lzo => Ok(Box::new(lzo::LzoCodec::new(lzo::LzoVariant::Lzo1x1_11))),
            #[cfg(not(feature = "lzo"))]
            Algorithm::Lzo => Err(Error::feature_unavailable("lzo compression not compiled in")),
            #[cfg(feature = "lzo")]
            Algorithm::Lzo1x1_15 => Ok(Box::new(lzo::LzoCodec::new(lzo::LzoVariant::Lzo1x1_15))),
            #[cfg(not(feature = "lzo"))]
            Algorithm::Lzo1x1_15 => Err(Error::feature_unavailable("lzo compression not compiled in")),
            #[cfg(feature = "lzo")]
            Algorithm::Lzo1x1 => Ok(Box::new(lzo::LzoCodec::new(lzo::LzoVariant::Lzo1x1))),
            #[cfg(not(feature = "lzo"))]
            Algorithm::Lzo1x1 => Err(Error::feature_unavailable("lzo compression not compiled in")),
            #[cfg(feature = "lzma")]
            Algorithm::Xz => Ok(Box::new(lzma::LzmaCodec::new(level))),
            #[cfg(not(feature = "lzma"))]
            Algorithm::Xz => Err(Error::feature_unavailable("lzma compression not compiled in")),
            #[cfg(feature = "zstd")]
            Algorithm::Zstd => Ok(Box::new(zstd::ZstdCodec::new(level as i32))),
            #[cfg(not(feature = "zstd"))]
            Algorithm::Zstd => Err(Error::feature_unavailable("zstd compression not compiled in")),
            #[cfg(feature = "lz4")]
            Algorithm::Lz4 => Ok(Box::new(lz4::Lz4Codec::new())),
            #[cfg(not(feature = "lz4"))]
            Algorithm::Lz4 => Err(Error::feature_unavailable("lz4 compression not compiled in")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_both_modes() {
        for algo in [
            Algorithm::None,
            Algorithm::Gzip,
            Algorithm::Bzip2,
            Algorithm::Lzo,
            Algorithm::Xz,
            Algorithm::Zstd,
            Algorithm::Lz4,
            Algorithm::Lzo1x1_15,
            Algorithm::Lzo1x1,
        ] {
            for mode in [TagMode::Stream, TagMode::Block] {
                let tag = algo.tag(mode);
                let (back, back_mode) = Algorithm::from_tag(tag).unwrap();
                assert_eq!(back, algo);
                assert_eq!(back_mode, mode);
            }
        }
    }

    #[test]
    fn unknown_tag_is_a_data_error() {
        assert!(Algorithm::from_tag('?').is_err());
    }

    #[test]
    fn none_codec_round_trips() {
        let codec = Algorithm::None.block_codec(0).unwrap();
        let input = b"hello, world";
        let mut buf = vec![0u8; codec.min_output_buffer_for(input.len())];
        let n = codec.compress(input, &mut buf).unwrap();
        let mut out = vec![0u8; input.len()];
        let m = codec.decompress(&buf[..n], &mut out).unwrap();
        assert_eq!(&out[..m], input);
    }
}

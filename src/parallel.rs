//! Parallel compressor (§4.I): a multi-thread pipelined variant of
//! [`crate::codec::stream`]'s streaming compressor.
//!
//! The source design pipelines a ratelier-scatter, N CPU workers, a
//! ratelier-gather and a single I/O thread; §9 calls that a bounded MPSC
//! producer / SPMC consumer pair "or equivalent" in idiomatic Rust. The
//! equivalent here is `rayon`'s work-stealing pool: [`compress`] chops the
//! input into fixed-size segments (the scatter), hands them to
//! `par_iter().map()` (the workers), and `collect()`s the results in input
//! order (the gather) before a single pass writes them out (the I/O
//! thread). `rayon`'s scheduler keeps every worker fed without a
//! hand-sized free-segment heap — the "2·rateliers + N + 2" in-flight
//! budget of §4.I is rayon's own work-stealing queue depth, not a value
//! this module tunes directly.
//!
//! Every segment is framed exactly as [`crate::codec::stream::Frame`]
//! frames its blocks, so [`compress`]'s output is byte-for-byte identical
//! to [`crate::codec::stream::CompressorStream`]'s output for the same
//! codec, level and block size (§4.I invariant, §8 testable property
//! "parallel compressor output is byte-for-byte equal to sequential
//! compressor output").

use crate::cancel::CancelToken;
use crate::codec::Codec;
use crate::codec::stream::{self, DEFAULT_BLOCK_SIZE, Frame};
use crate::error::Result;
use crate::stream::Stream;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Tunable knobs for the parallel compressor, following the crate's
/// `*Options` builder convention.
#[derive(Debug, Clone)]
pub struct ParallelOptions {
    /// Size of each independently-compressed segment.
    pub block_size: usize,
    /// Worker thread count; `None` lets `rayon` pick (typically one per
    /// core).
    pub threads: Option<usize>,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        ParallelOptions { block_size: DEFAULT_BLOCK_SIZE, threads: None }
    }
}

impl ParallelOptions {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the segment size every worker compresses independently.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(512);
        self
    }

    /// Pin the worker count instead of letting `rayon` auto-detect it.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

fn run_pool<T: Send>(options: &ParallelOptions, f: impl FnOnce() -> T + Send) -> Result<T> {
    match options.threads {
        #[cfg(feature = "parallel")]
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| crate::error::Error::bug(format!("failed to build thread pool: {e}")))?;
            Ok(pool.install(f))
        }
        _ => Ok(f()),
    }
}

/// Compress `data` through `codec` using up to `options.threads` workers,
/// writing the framed, gather-ordered output to `output`. Polls `cancel`
/// once per segment, both before dispatch and as each segment completes,
/// matching the "checked inside the per-block I/O" cancellation contract
/// of §5.
pub fn compress<W: Stream>(
    output: &mut W,
    data: &[u8],
    codec: &dyn Codec,
    options: &ParallelOptions,
    cancel: &CancelToken,
) -> Result<()> {
    cancel.check()?;
    let block_size = options.block_size.max(1);
    let segments: Vec<&[u8]> = if data.is_empty() { Vec::new() } else { data.chunks(block_size).collect() };

    let frames: Vec<Frame> = run_pool(options, || -> Result<Vec<Frame>> {
        #[cfg(feature = "parallel")]
        {
            segments
                .par_iter()
                .map(|segment| {
                    cancel.check()?;
                    stream::compress_block(codec, segment, false)
                })
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            segments
                .iter()
                .map(|segment| {
                    cancel.check()?;
                    stream::compress_block(codec, segment, false)
                })
                .collect()
        }
    })??;

    for frame in &frames {
        cancel.check()?;
        output.write(&frame.encode())?;
    }
    Ok(())
}

/// Decompress a framed stream written by [`compress`] (or by
/// [`crate::codec::stream::CompressorStream`]): read every frame
/// sequentially (the single-I/O-thread step of §4.I — framing is
/// inherently sequential since each frame's length is only known once the
/// previous one has been read), then decompress the frame bodies across
/// the worker pool and concatenate in order.
pub fn decompress<R: Stream>(
    input: &mut R,
    codec: &dyn Codec,
    options: &ParallelOptions,
    cancel: &CancelToken,
) -> Result<Vec<u8>> {
    cancel.check()?;
    let mut frames = Vec::new();
    while let Some(frame) = crate::codec::stream::Frame::read_from(input)? {
        frames.push(frame);
    }

    let decoded: Vec<Vec<u8>> = run_pool(options, || -> Result<Vec<Vec<u8>>> {
        #[cfg(feature = "parallel")]
        {
            frames
                .par_iter()
                .map(|frame| {
                    cancel.check()?;
                    stream::decompress_frame(codec, frame)
                })
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            frames
                .iter()
                .map(|frame| {
                    cancel.check()?;
                    stream::decompress_frame(codec, frame)
                })
                .collect()
        }
    })??;

    let total: usize = decoded.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in decoded {
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Algorithm;

    struct MemStream {
        data: Vec<u8>,
        pos: usize,
    }

    impl MemStream {
        fn new() -> Self {
            MemStream { data: Vec::new(), pos: 0 }
        }
    }

    impl Stream for MemStream {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = (self.data.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
        fn write(&mut self, buf: &[u8]) -> Result<()> {
            self.data.extend_from_slice(buf);
            self.pos = self.data.len();
            Ok(())
        }
        fn skip(&mut self, pos: u64) -> Result<()> {
            self.pos = pos as usize;
            Ok(())
        }
        fn skip_relative(&mut self, delta: i64) -> Result<()> {
            self.pos = (self.pos as i64 + delta) as usize;
            Ok(())
        }
        fn skip_to_eof(&mut self) -> Result<()> {
            self.pos = self.data.len();
            Ok(())
        }
        fn get_position(&self) -> Result<u64> {
            Ok(self.pos as u64)
        }
        fn skippable(&self, _direction: crate::stream::SkipDirection, _amount: u64) -> bool {
            true
        }
        fn truncate(&mut self, pos: u64) -> Result<()> {
            self.data.truncate(pos as usize);
            Ok(())
        }
        fn truncatable(&self, _pos: u64) -> bool {
            true
        }
        fn sync_write(&mut self) -> Result<()> {
            Ok(())
        }
        fn flush_read(&mut self) -> Result<()> {
            Ok(())
        }
        fn terminate(&mut self) -> Result<()> {
            Ok(())
        }
        fn reset_crc(&mut self, _width: crate::stream::CrcWidth) {}
        fn get_crc(&mut self) -> Option<crate::stream::CrcValue> {
            None
        }
    }

    fn sequential_compress(data: &[u8], codec: &dyn Codec, block_size: usize) -> Vec<u8> {
        let out = MemStream::new();
        let mut compressor =
            crate::codec::stream::CompressorStream::new(out, codec.clone_box(), block_size);
        compressor.write(data).unwrap();
        compressor.finish().unwrap().data
    }

    #[test]
    fn parallel_output_matches_sequential() {
        let codec = Algorithm::None.block_codec(0).unwrap();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let options = ParallelOptions::new().block_size(4096).threads(4);
        let cancel = CancelToken::new();

        let mut parallel_out = MemStream::new();
        compress(&mut parallel_out, &data, codec.as_ref(), &options, &cancel).unwrap();

        let sequential_out = sequential_compress(&data, codec.as_ref(), 4096);
        assert_eq!(parallel_out.data, sequential_out);
    }

    #[test]
    fn decompress_round_trips() {
        let codec = Algorithm::None.block_codec(0).unwrap();
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 199) as u8).collect();
        let options = ParallelOptions::new().block_size(8192);
        let cancel = CancelToken::new();

        let mut compressed = MemStream::new();
        compress(&mut compressed, &data, codec.as_ref(), &options, &cancel).unwrap();
        compressed.skip(0).unwrap();
        let decoded = decompress(&mut compressed, codec.as_ref(), &options, &cancel).unwrap();
        assert_eq!(decoded, data);
    }
}

//! Streaming compressor (§4.H): transforms a clear-data [`Stream`] into a
//! compressed one (write mode) or back (read mode).
//!
//! The compressed body is a sequence of independently-framed blocks:
//!
//! ```text
//! [ BigInt raw_len ] [ flag byte: 0=raw, 1=compressed ] [ BigInt payload_len ] [ payload bytes ]
//! ```
//!
//! `raw_len` is always the uncompressed size of the block, `flag` records
//! whether the payload is the codec's compressed form or a verbatim copy
//! (written while [`CompressorStream::suspend_compression`] is in effect,
//! §4.H), and `payload_len` is the byte count of what follows. Framing each
//! block independently is what makes seeking on read possible without
//! reprocessing the whole stream: `DecompressorStream` only has to replay
//! forward from the nearest frame boundary at or before the target
//! position, not from the very start (§4.H, §8 testable property list).
//! [`crate::parallel`] reuses this exact frame format so its output is
//! byte-for-byte identical to this module's sequential output (§4.I
//! invariant), just compressed by a worker pool instead of one thread.

use crate::bigint::BigInt;
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::stream::{CrcValue, CrcWidth, RunningCrc, SkipDirection, Stream, Terminated};

/// Default block size a [`CompressorStream`] buffers before flushing a
/// frame. §4.I reuses the same constant as its default segment size so the
/// two pipelines agree on framing by default.
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

const FLAG_RAW: u8 = 0;
const FLAG_COMPRESSED: u8 = 1;

/// Adapts a `&mut dyn Stream` to `std::io::Read`/`Write` for the one place
/// this module needs it: framing a [`BigInt`] length, which only knows how
/// to serialize against the standard I/O traits.
struct StreamIo<'a>(&'a mut dyn Stream);

impl std::io::Read for StreamIo<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf).map_err(std::io::Error::other)
    }
}

impl std::io::Write for StreamIo<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn write_bigint(stream: &mut dyn Stream, value: &BigInt) -> Result<()> {
    let bytes = value.to_wire();
    stream.write(&bytes)
}

fn read_bigint(stream: &mut dyn Stream) -> Result<BigInt> {
    BigInt::read_from(&mut StreamIo(stream))
}

/// One compressed frame, as encoded on the wire.
pub(crate) struct Frame {
    pub raw_len: u64,
    pub flag: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Encode this frame to its wire bytes, independent of any [`Stream`].
    /// [`crate::parallel`] uses this to assemble worker output without
    /// needing a stream handle per segment.
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = BigInt::from(self.raw_len).to_wire();
        out.push(self.flag);
        out.extend_from_slice(&BigInt::from(self.payload.len() as u64).to_wire());
        out.extend_from_slice(&self.payload);
        out
    }

    pub(crate) fn write_to(&self, stream: &mut dyn Stream) -> Result<()> {
        write_bigint(stream, &BigInt::from(self.raw_len))?;
        stream.write(&[self.flag])?;
        write_bigint(stream, &BigInt::from(self.payload.len() as u64))?;
        stream.write(&self.payload)
    }

    pub(crate) fn read_from(stream: &mut dyn Stream) -> Result<Option<Self>> {
        let raw_len = match read_bigint(stream) {
            Ok(v) => v,
            Err(Error::EndOfFile) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut flag = [0u8; 1];
        stream.read_exact(&mut flag)?;
        let payload_len = read_bigint(stream)?.to_u64()?;
        let mut payload = vec![0u8; payload_len as usize];
        stream.read_exact(&mut payload)?;
        Ok(Some(Frame { raw_len: raw_len.to_u64()?, flag: flag[0], payload }))
    }
}

/// Compress a single block into a [`Frame`], honoring suspension.
pub(crate) fn compress_block(codec: &dyn Codec, block: &[u8], suspended: bool) -> Result<Frame> {
    if suspended || block.is_empty() {
        return Ok(Frame { raw_len: block.len() as u64, flag: FLAG_RAW, payload: block.to_vec() });
    }
    let mut buf = vec![0u8; codec.min_output_buffer_for(block.len())];
    let n = codec.compress(block, &mut buf)?;
    buf.truncate(n);
    if buf.len() >= block.len() {
        // Incompressible block: storing it raw never costs more than one
        // extra flag byte, and keeps decompression trivial.
        Ok(Frame { raw_len: block.len() as u64, flag: FLAG_RAW, payload: block.to_vec() })
    } else {
        Ok(Frame { raw_len: block.len() as u64, flag: FLAG_COMPRESSED, payload: buf })
    }
}

pub(crate) fn decompress_frame(codec: &dyn Codec, frame: &Frame) -> Result<Vec<u8>> {
    match frame.flag {
        FLAG_RAW => Ok(frame.payload.clone()),
        FLAG_COMPRESSED => {
            let mut out = vec![0u8; frame.raw_len as usize];
            let n = codec.decompress(&frame.payload, &mut out)?;
            if n as u64 != frame.raw_len {
                return Err(Error::data("compressed block decoded to an unexpected length"));
            }
            Ok(out)
        }
        other => Err(Error::data(format!("unknown frame flag {other}"))),
    }
}

/// Write-mode half of §4.H: buffers clear data up to [`DEFAULT_BLOCK_SIZE`]
/// (or a caller-chosen size) and flushes each full block as one [`Frame`]
/// to the underlying stream.
pub struct CompressorStream<W> {
    inner: W,
    codec: Box<dyn Codec>,
    block_size: usize,
    buffer: Vec<u8>,
    position: u64,
    suspended: bool,
    terminated: Terminated,
    crc: RunningCrc,
}

impl<W: Stream> CompressorStream<W> {
    /// Wrap `inner` so every byte written to this stream is buffered and
    /// compressed through `codec` in blocks of `block_size` bytes.
    pub fn new(inner: W, codec: Box<dyn Codec>, block_size: usize) -> Self {
        CompressorStream {
            inner,
            codec,
            block_size: block_size.max(1),
            buffer: Vec::new(),
            position: 0,
            suspended: false,
            terminated: Terminated::default(),
            crc: RunningCrc::default(),
        }
    }

    /// Bypass the codec for subsequent bytes: they are framed verbatim
    /// until [`CompressorStream::resume_compression`] is called. The
    /// transition flushes any block already buffered under the old mode.
    pub fn suspend_compression(&mut self) -> Result<()> {
        self.flush_block()?;
        self.suspended = true;
        Ok(())
    }

    /// Resume codec compression for subsequent bytes, flushing the
    /// raw-passthrough block first.
    pub fn resume_compression(&mut self) -> Result<()> {
        self.flush_block()?;
        self.suspended = false;
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let frame = compress_block(self.codec.as_ref(), &self.buffer, self.suspended)?;
        frame.write_to(&mut self.inner)?;
        self.buffer.clear();
        Ok(())
    }

    /// Consume the compressor, flushing the final partial block and
    /// returning the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        self.flush_block()?;
        self.terminated.set();
        Ok(self.inner)
    }
}

impl<W: Stream> Stream for CompressorStream<W> {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::library_misuse("CompressorStream is write-only"))
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.terminated.check()?;
        self.crc.update(buf);
        self.buffer.extend_from_slice(buf);
        self.position += buf.len() as u64;
        while self.buffer.len() >= self.block_size {
            let rest = self.buffer.split_off(self.block_size);
            let frame = compress_block(self.codec.as_ref(), &self.buffer, self.suspended)?;
            frame.write_to(&mut self.inner)?;
            self.buffer = rest;
        }
        Ok(())
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        if pos != self.position {
            return Err(Error::library_misuse(
                "CompressorStream only supports flush-in-place seeking to the current position",
            ));
        }
        self.flush_block()
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        if delta == 0 {
            return self.flush_block();
        }
        Err(Error::library_misuse("CompressorStream cannot seek while writing"))
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        self.flush_block()
    }

    fn get_position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn skippable(&self, _direction: SkipDirection, _amount: u64) -> bool {
        false
    }

    fn truncate(&mut self, _pos: u64) -> Result<()> {
        Err(Error::library_misuse("CompressorStream does not support truncate"))
    }

    fn truncatable(&self, _pos: u64) -> bool {
        false
    }

    fn sync_write(&mut self) -> Result<()> {
        self.flush_block()?;
        self.inner.sync_write()
    }

    fn flush_read(&mut self) -> Result<()> {
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.flush_block()?;
        self.terminated.set();
        self.inner.terminate()
    }

    fn reset_crc(&mut self, width: CrcWidth) {
        self.crc.arm(width);
    }

    fn get_crc(&mut self) -> Option<CrcValue> {
        self.crc.take()
    }
}

/// One decoded frame's position in both the logical (uncompressed) and
/// underlying (compressed) address spaces, used to reconstruct which
/// region of the underlying stream to re-read on a backward seek.
#[derive(Debug, Clone, Copy)]
struct FrameRecord {
    logical_start: u64,
    logical_len: u64,
    underlying_start: u64,
}

/// Read-mode half of §4.H: decompresses [`Frame`]s from the underlying
/// stream on demand and presents them as one continuous clear-data stream.
///
/// Seeking forward into unread territory decompresses sequentially until
/// the target frame is reached; seeking backward re-opens the underlying
/// stream at the nearest known frame boundary and replays forward from
/// there — "re-decompressing from the nearest restart point" per §4.H.
pub struct DecompressorStream<R> {
    inner: R,
    codec: Box<dyn Codec>,
    frames: Vec<FrameRecord>,
    current: Vec<u8>,
    current_offset: usize,
    current_logical_start: u64,
    position: u64,
    eof: bool,
    terminated: Terminated,
    crc: RunningCrc,
}

impl<R: Stream> DecompressorStream<R> {
    /// Wrap `inner`, decompressing through `codec` on read.
    pub fn new(inner: R, codec: Box<dyn Codec>) -> Self {
        DecompressorStream {
            inner,
            codec,
            frames: Vec::new(),
            current: Vec::new(),
            current_offset: 0,
            current_logical_start: 0,
            position: 0,
            eof: false,
            terminated: Terminated::default(),
            crc: RunningCrc::default(),
        }
    }

    fn advance_frame(&mut self) -> Result<bool> {
        let underlying_start = self.inner.get_position()?;
        let Some(frame) = Frame::read_from(&mut self.inner)? else {
            self.eof = true;
            return Ok(false);
        };
        let logical_start = self
            .frames
            .last()
            .map(|f| f.logical_start + f.logical_len)
            .unwrap_or(0);
        let decoded = decompress_frame(self.codec.as_ref(), &frame)?;
        self.frames.push(FrameRecord {
            logical_start,
            logical_len: decoded.len() as u64,
            underlying_start,
        });
        self.current = decoded;
        self.current_offset = 0;
        self.current_logical_start = logical_start;
        Ok(true)
    }

    /// Locate and load the block containing logical position `pos`,
    /// reading/decompressing forward or rewinding as needed.
    fn seek_to(&mut self, pos: u64) -> Result<()> {
        if let Some(record) = self
            .frames
            .iter()
            .find(|f| pos >= f.logical_start && pos < f.logical_start + f.logical_len)
        {
            if record.logical_start != self.current_logical_start || self.current.is_empty() {
                self.inner.skip(record.underlying_start)?;
                let underlying_start = self.inner.get_position()?;
                let frame = Frame::read_from(&mut self.inner)?
                    .ok_or_else(|| Error::data("expected frame at recorded offset, found EOF"))?;
                let decoded = decompress_frame(self.codec.as_ref(), &frame)?;
                debug_assert_eq!(underlying_start, record.underlying_start);
                self.current = decoded;
                self.current_logical_start = record.logical_start;
            }
            self.current_offset = (pos - self.current_logical_start) as usize;
            self.position = pos;
            self.eof = false;
            return Ok(());
        }

        let known_end = self.frames.last().map(|f| f.logical_start + f.logical_len).unwrap_or(0);

        // Forward into unread territory: decompress sequentially. (A
        // backward seek to a position inside an already-recorded frame is
        // handled by the `find` above — since every frame's metadata stays
        // indexed, "nearest restart point" never needs a full rewind here;
        // only the single target frame gets re-decompressed.)
        loop {
            if pos < self.current_logical_start + self.current.len() as u64 {
                self.current_offset = (pos - self.current_logical_start) as usize;
                self.position = pos;
                return Ok(());
            }
            if !self.advance_frame()? {
                if pos == known_end.max(self.current_logical_start + self.current.len() as u64) {
                    self.current_offset = self.current.len();
                    self.position = pos;
                    return Ok(());
                }
                return Err(Error::data("seek position past end of compressed stream"));
            }
        }
    }
}

impl<R: Stream> Stream for DecompressorStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.terminated.check()?;
        if self.current_offset >= self.current.len() {
            if self.eof || !self.advance_frame()? {
                return Ok(0);
            }
        }
        let available = &self.current[self.current_offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.current_offset += n;
        self.position += n as u64;
        self.crc.update(&buf[..n]);
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::library_misuse("DecompressorStream is read-only"))
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        self.seek_to(pos)
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        let target = if delta >= 0 {
            self.position + delta as u64
        } else {
            self.position.checked_sub((-delta) as u64).ok_or_else(|| Error::range("seek before start"))?
        };
        self.seek_to(target)
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        loop {
            if !self.advance_frame()? {
                break;
            }
        }
        self.current_offset = self.current.len();
        self.position =
            self.frames.last().map(|f| f.logical_start + f.logical_len).unwrap_or(0);
        Ok(())
    }

    fn get_position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn skippable(&self, _direction: SkipDirection, _amount: u64) -> bool {
        true
    }

    fn truncate(&mut self, _pos: u64) -> Result<()> {
        Err(Error::library_misuse("DecompressorStream does not support truncate"))
    }

    fn truncatable(&self, _pos: u64) -> bool {
        false
    }

    fn sync_write(&mut self) -> Result<()> {
        Ok(())
    }

    fn flush_read(&mut self) -> Result<()> {
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.terminated.set();
        self.inner.terminate()
    }

    fn reset_crc(&mut self, width: CrcWidth) {
        self.crc.arm(width);
    }

    fn get_crc(&mut self) -> Option<CrcValue> {
        self.crc.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::copy::CopyCodec;

    struct MemStream {
        data: Vec<u8>,
        pos: usize,
        terminated: Terminated,
    }

    impl MemStream {
        fn new() -> Self {
            MemStream { data: Vec::new(), pos: 0, terminated: Terminated::default() }
        }
    }

    impl Stream for MemStream {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.terminated.check()?;
            let n = (self.data.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<()> {
            self.terminated.check()?;
            if self.pos == self.data.len() {
                self.data.extend_from_slice(buf);
            } else {
                let end = self.pos + buf.len();
                if end > self.data.len() {
                    self.data.resize(end, 0);
                }
                self.data[self.pos..end].copy_from_slice(buf);
            }
            self.pos += buf.len();
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

        fn skippable(&self, _direction: SkipDirection, _amount: u64) -> bool {
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
            self.terminated.set();
            Ok(())
        }

        fn reset_crc(&mut self, _width: CrcWidth) {}

        fn get_crc(&mut self) -> Option<CrcValue> {
            None
        }
    }

    #[test]
    fn round_trips_multiple_blocks() {
        let backing = MemStream::new();
        let mut compressor = CompressorStream::new(backing, Box::new(CopyCodec), 16);
        let input = b"0123456789abcdef0123456789abcdef0123456789";
        compressor.write(input).unwrap();
        let backing = compressor.finish().unwrap();

        let mut decompressor = DecompressorStream::new(backing, Box::new(CopyCodec));
        let mut out = vec![0u8; input.len()];
        decompressor.read_exact(&mut out).unwrap();
        assert_eq!(&out[..], &input[..]);
    }

    #[test]
    fn seek_backward_replays_from_start() {
        let backing = MemStream::new();
        let mut compressor = CompressorStream::new(backing, Box::new(CopyCodec), 8);
        let input: Vec<u8> = (0u8..64).collect();
        compressor.write(&input).unwrap();
        let backing = compressor.finish().unwrap();

        let mut decompressor = DecompressorStream::new(backing, Box::new(CopyCodec));
        let mut buf = [0u8; 10];
        decompressor.skip(40).unwrap();
        decompressor.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, &input[40..50]);

        decompressor.skip(5).unwrap();
        decompressor.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, &input[5..15]);
    }

    #[test]
    fn suspend_resume_passes_bytes_through() {
        let backing = MemStream::new();
        let mut compressor = CompressorStream::new(backing, Box::new(CopyCodec), 1024);
        compressor.write(b"compressed-ish").unwrap();
        compressor.suspend_compression().unwrap();
        compressor.write(b"raw passthrough").unwrap();
        compressor.resume_compression().unwrap();
        compressor.write(b"compressed-ish again").unwrap();
        let backing = compressor.finish().unwrap();

        let mut decompressor = DecompressorStream::new(backing, Box::new(CopyCodec));
        let mut out = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = decompressor.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"compressed-ishraw passthroughcompressed-ish again");
    }
}

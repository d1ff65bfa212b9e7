//! Abstract byte stream capability shared by every layer of the pipeline.
//!
//! [`Stream`] replaces the deep inheritance hierarchy a generic-file base
//! class would give this design in a language with virtual dispatch: any
//! concrete backend (local file, pipe, slice, cipher, codec) implements the
//! trait directly, and layers are stacked by explicit composition — a
//! cipher stream owns a `Box<dyn Stream>` for the layer underneath it, a
//! slice stream owns one per open volume, and so on. There is no shared
//! base class to inherit from.

use crate::checksum::{Checksum, Crc32, Crc64};
use crate::error::{Error, Result};

/// Access mode a stream was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Reads only; writes fail with [`Error::library_misuse`].
    ReadOnly,
    /// Writes only; reads fail with [`Error::library_misuse`].
    WriteOnly,
    /// Both reads and writes are permitted.
    ReadWrite,
}

/// Direction argument to [`Stream::skippable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    /// Skipping toward lower positions.
    Backward,
    /// Skipping toward higher positions.
    Forward,
}

/// Advisory access pattern hint, passed through to `posix_fadvise`-like APIs
/// by backends that support it. Backends without such an API ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    /// No particular access pattern.
    Normal,
    /// Mostly sequential access.
    Sequential,
    /// Mostly random access.
    Random,
    /// Data will not be reused; drop cached pages eagerly once read.
    NoReuse,
    /// Data will be needed soon; prefetch.
    WillNeed,
    /// Data will not be needed soon; release cached pages.
    DontNeed,
}

/// Width of a stream's running CRC, armed with [`Stream::reset_crc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcWidth {
    /// 32-bit CRC.
    Crc32,
    /// 64-bit CRC.
    Crc64,
}

/// A computed CRC value, tagged by the width it was computed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcValue {
    /// 32-bit CRC result.
    Crc32(u32),
    /// 64-bit CRC result.
    Crc64(u64),
}

/// Running CRC state armed by [`Stream::reset_crc`], held by stream
/// implementations via [`RunningCrc::update`] on every read or write.
#[derive(Debug, Clone)]
pub(crate) enum RunningCrc {
    Off,
    Crc32(Crc32),
    Crc64(Crc64),
}

impl Default for RunningCrc {
    fn default() -> Self {
        RunningCrc::Off
    }
}

impl RunningCrc {
    pub(crate) fn arm(&mut self, width: CrcWidth) {
        *self = match width {
            CrcWidth::Crc32 => RunningCrc::Crc32(Crc32::new()),
            CrcWidth::Crc64 => RunningCrc::Crc64(Crc64::new()),
        };
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            RunningCrc::Off => {}
            RunningCrc::Crc32(c) => c.update(data),
            RunningCrc::Crc64(c) => c.update(data),
        }
    }

    pub(crate) fn take(&mut self) -> Option<CrcValue> {
        let value = match self {
            RunningCrc::Off => None,
            RunningCrc::Crc32(c) => Some(CrcValue::Crc32(c.finalize())),
            RunningCrc::Crc64(c) => Some(CrcValue::Crc64(c.finalize())),
        };
        *self = RunningCrc::Off;
        value
    }
}

/// Abstract stream capability implemented by every concrete backend in the
/// pipeline (local file, pipe, slice, cipher, codec).
///
/// Contract (mirrors the invariants every implementation must uphold):
/// - after `terminate()`, every operation fails with [`Error::library_misuse`];
/// - `read` may return fewer bytes than requested only at end-of-stream, or
///   for a non-blocking backend where a short read is semantically valid
///   (a pipe); callers at the slice/codec layer loop until they have what
///   they need or hit end-of-stream;
/// - `write` never partially completes for public callers: a write that
///   cannot complete raises a hardware error;
/// - after a successful write of `n` bytes, `get_position()` equals the
///   position beforehand plus `n`; after a read returning `k`, position
///   advances by `k`.
pub trait Stream {
    /// Read up to `buf.len()` bytes, returning the number actually read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `buf`.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Seek to an absolute position.
    fn skip(&mut self, pos: u64) -> Result<()>;

    /// Seek relative to the current position.
    fn skip_relative(&mut self, delta: i64) -> Result<()>;

    /// Seek to end-of-stream.
    fn skip_to_eof(&mut self) -> Result<()>;

    /// Current position.
    fn get_position(&self) -> Result<u64>;

    /// Whether a skip of `amount` bytes in `direction` is supported by this
    /// backend, without performing it.
    fn skippable(&self, direction: SkipDirection, amount: u64) -> bool;

    /// Truncate the stream at `pos`, where supported.
    fn truncate(&mut self, pos: u64) -> Result<()>;

    /// Whether `truncate(pos)` is supported by this backend.
    fn truncatable(&self, pos: u64) -> bool;

    /// Performance hint: the next `amount` bytes will be read soon.
    fn read_ahead(&mut self, amount: u64) -> Result<()> {
        let _ = amount;
        Ok(())
    }

    /// Force buffered writes out to the backend.
    fn sync_write(&mut self) -> Result<()>;

    /// Discard any buffered read-ahead state.
    fn flush_read(&mut self) -> Result<()>;

    /// Flush and transition to a frozen state; every subsequent operation fails.
    fn terminate(&mut self) -> Result<()>;

    /// Arm a running CRC of the given width; overwrites any CRC already armed.
    fn reset_crc(&mut self, width: CrcWidth);

    /// Return and disarm the running CRC, if one was armed.
    fn get_crc(&mut self) -> Option<CrcValue>;

    /// Read exactly `buf.len()` bytes, looping over short reads until the
    /// buffer is full or end-of-stream is reached.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(Error::data("short read where a full block was expected"));
            }
            filled += n;
        }
        Ok(())
    }
}

/// Guards every [`Stream`] method against use after [`Stream::terminate`].
///
/// Concrete stream types hold a `Terminated` field and call
/// [`Terminated::check`] at the top of every trait method; once set, no
/// further operation succeeds, matching the "frozen state" contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Terminated(bool);

impl Terminated {
    pub(crate) fn check(&self) -> Result<()> {
        if self.0 {
            Err(Error::library_misuse("operation attempted on a terminated stream"))
        } else {
            Ok(())
        }
    }

    pub(crate) fn set(&mut self) {
        self.0 = true;
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0
    }
}

//! Slice layer: one logical seekable stream over numbered slice files (§4.F).
//!
//! A sliced archive body is split across files named `<base>.<N>.<ext>`,
//! 1-based. Slice 1 may have its own size `S0`; every later slice shares a
//! common size `S`. [`SliceLayout`] is the pure position↔(slice, offset)
//! mapping (§8 testable property 5); [`SliceWriter`] and [`SliceReader`]
//! drive it against real files, splitting writes exactly at a boundary and
//! stitching reads transparently across one.

use std::path::{Path as StdPath, PathBuf};

use crate::error::{Error, Result};
use crate::hash_sink::{HashAlgorithm, HashSink};
use crate::local_file::LocalFileStream;
use crate::stream::{CrcValue, CrcWidth, SkipDirection, Stream, Terminated};

/// Pure position↔(slice, within-slice-offset) mapping, independent of any
/// actual files. `slice_size == 0` means "single slice, no splitting".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceLayout {
    first_slice_size: u64,
    slice_size: u64,
}

impl SliceLayout {
    /// A layout with a distinct first-slice size `s0` and common size `s`
    /// for every slice after it. `s == 0` means no splitting after slice 1
    /// (an unbounded final slice).
    pub fn new(first_slice_size: u64, slice_size: u64) -> Self {
        SliceLayout { first_slice_size, slice_size }
    }

    /// A layout where every slice, including the first, has the same size.
    pub fn uniform(slice_size: u64) -> Self {
        SliceLayout { first_slice_size: slice_size, slice_size }
    }

    /// Map a logical position to `(slice_number, within_slice_offset)`,
    /// 1-based slice numbers.
    pub fn locate(&self, pos: u64) -> (u64, u64) {
        if pos < self.first_slice_size || self.slice_size == 0 {
            return (1, pos);
        }
        let rem = pos - self.first_slice_size;
        if self.slice_size == 0 {
            return (1, pos);
        }
        let slice = 2 + rem / self.slice_size;
        let within = rem % self.slice_size;
        (slice, within)
    }

    /// Inverse of [`SliceLayout::locate`]: the logical position of
    /// `within_slice_offset` bytes into `slice_number`.
    pub fn position_of(&self, slice_number: u64, within_slice_offset: u64) -> u64 {
        if slice_number <= 1 {
            within_slice_offset
        } else {
            self.first_slice_size + (slice_number - 2) * self.slice_size + within_slice_offset
        }
    }

    /// Bytes remaining in `slice_number` from `within_slice_offset` before
    /// the next slice boundary. `None` means the slice is unbounded (a
    /// single-slice layout, or slice 1 when `slice_size` is 0).
    pub fn remaining_in_slice(&self, slice_number: u64, within_slice_offset: u64) -> Option<u64> {
        let size = if slice_number <= 1 { self.first_slice_size } else { self.slice_size };
        if size == 0 {
            return None;
        }
        Some(size.saturating_sub(within_slice_offset))
    }
}

/// What to do when a slice file that's about to be overwritten already
/// exists. The mask/policy language itself is a collaborator interface
/// (§1); the slice layer only consults the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteDecision {
    /// Replace the existing file without asking.
    Allow,
    /// Replace the existing file, but the caller should have surfaced a
    /// warning before this decision was reached.
    Warn,
    /// Refuse to replace the existing file.
    Deny,
}

/// Pluggable overwrite policy, consulted once per slice file about to be
/// created. The default (`None`) always allows, matching a non-interactive
/// "blind" build (§7).
pub type OverwritePolicy = dyn Fn(&StdPath) -> OverwriteDecision;

/// What happens when a slice file required for a read or seek is missing.
/// The actual prompt/pause surface is a collaborator interface (§1); the
/// slice layer only consults the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSliceDecision {
    /// Try opening the slice again (e.g. after the user has mounted media).
    Retry,
    /// Give up; surfaces as [`Error::user_abort`].
    Abort,
}

/// Pluggable prompt for a missing slice. A non-interactive ("blind") build
/// has no way to wait for remedial action and should abort rather than
/// spin retrying forever; see `DESIGN.md` for the rationale.
pub type MissingSlicePrompt = dyn Fn(u64, &StdPath) -> MissingSliceDecision;

fn slice_filename(base: &str, ext: &str, slice_number: u64) -> String {
    format!("{base}.{slice_number}.{ext}")
}

fn slice_path(dir: &StdPath, base: &str, ext: &str, slice_number: u64) -> PathBuf {
    dir.join(slice_filename(base, ext, slice_number))
}

/// Configuration shared by [`SliceWriter`] and [`SliceReader`].
#[derive(Debug, Clone)]
pub struct SliceConfig {
    /// Directory the slice files live in.
    pub dir: PathBuf,
    /// Slice basename, before `.<N>.<ext>`.
    pub base: String,
    /// Slice filename extension.
    pub ext: String,
    /// Layout (first-slice size, common slice size).
    pub layout: SliceLayout,
    /// Hash algorithm for per-slice sidecars; [`HashAlgorithm::None`]
    /// disables them.
    pub hash_algorithm: HashAlgorithm,
    /// Whether to pause (consult a caller-supplied hook) between slices on
    /// write, e.g. to let the user swap removable media.
    pub pause_between_slices: bool,
}

impl SliceConfig {
    /// A single-file (unsliced) configuration: `slice_size == 0`.
    pub fn single_file(dir: impl Into<PathBuf>, base: impl Into<String>, ext: impl Into<String>) -> Self {
        SliceConfig {
            dir: dir.into(),
            base: base.into(),
            ext: ext.into(),
            layout: SliceLayout::uniform(0),
            hash_algorithm: HashAlgorithm::None,
            pause_between_slices: false,
        }
    }

    /// A sliced configuration with a distinct first-slice size.
    pub fn sliced(
        dir: impl Into<PathBuf>,
        base: impl Into<String>,
        ext: impl Into<String>,
        first_slice_size: u64,
        slice_size: u64,
    ) -> Self {
        SliceConfig {
            dir: dir.into(),
            base: base.into(),
            ext: ext.into(),
            layout: SliceLayout::new(first_slice_size, slice_size),
            hash_algorithm: HashAlgorithm::None,
            pause_between_slices: false,
        }
    }

    /// Enable per-slice hash sidecars.
    pub fn with_hash(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }
}

enum WriteBacking {
    Plain(LocalFileStream),
    Hashed(HashSink<LocalFileStream>),
}

impl WriteBacking {
    fn as_stream(&mut self) -> &mut dyn Stream {
        match self {
            WriteBacking::Plain(s) => s,
            WriteBacking::Hashed(s) => s,
        }
    }
}

/// Writes a single logical stream across numbered slice files.
///
/// The slice layer holds at most one open file at a time (§5): opening
/// slice N+1 always follows terminating slice N.
pub struct SliceWriter {
    config: SliceConfig,
    current: Option<WriteBacking>,
    slice_number: u64,
    within: u64,
    position: u64,
    overwrite: Option<Box<OverwritePolicy>>,
    on_boundary: Option<Box<dyn FnMut(u64)>>,
    terminated: Terminated,
}

impl SliceWriter {
    /// Start a fresh write at slice 1, position 0.
    pub fn create(config: SliceConfig) -> Self {
        SliceWriter {
            config,
            current: None,
            slice_number: 1,
            within: 0,
            position: 0,
            overwrite: None,
            on_boundary: None,
            terminated: Terminated::default(),
        }
    }

    /// Install an overwrite policy consulted before each slice file is
    /// created. Without one, creation always proceeds as if `Allow`.
    pub fn with_overwrite_policy(mut self, policy: impl Fn(&StdPath) -> OverwriteDecision + 'static) -> Self {
        self.overwrite = Some(Box::new(policy));
        self
    }

    /// Install a hook invoked after a slice is closed and before the next
    /// one opens, when [`SliceConfig::pause_between_slices`] is set.
    pub fn with_boundary_hook(mut self, hook: impl FnMut(u64) + 'static) -> Self {
        self.on_boundary = Some(Box::new(hook));
        self
    }

    fn open_slice(&mut self, number: u64) -> Result<()> {
        let path = slice_path(&self.config.dir, &self.config.base, &self.config.ext, number);
        if path.exists() {
            let decision = self.overwrite.as_ref().map(|f| f(&path)).unwrap_or(OverwriteDecision::Allow);
            match decision {
                OverwriteDecision::Allow | OverwriteDecision::Warn => {}
                OverwriteDecision::Deny => {
                    return Err(Error::user_abort(format!("refusing to overwrite existing slice {path:?}")));
                }
            }
        }
        let file = LocalFileStream::create_write(&path, false, true)?;
        let backing = if self.config.hash_algorithm == HashAlgorithm::None {
            WriteBacking::Plain(file)
        } else {
            let sidecar = path.with_extension(format!(
                "{}.{}",
                self.config.ext, self.config.hash_algorithm.extension()
            ));
            let basename = slice_filename(&self.config.base, &self.config.ext, number);
            WriteBacking::Hashed(HashSink::new(file, self.config.hash_algorithm, sidecar, basename)?)
        };
        self.current = Some(backing);
        self.within = 0;
        Ok(())
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.current.is_none() {
            self.open_slice(self.slice_number)?;
        }
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut backing) = self.current.take() {
            backing.as_stream().terminate()?;
        }
        Ok(())
    }

    /// Close the current slice and return the total number of slices
    /// written. No trailer support beyond plain data: the catalog trailer
    /// itself is out of scope (§1 Non-goals).
    pub fn finish(mut self) -> Result<u64> {
        self.close_current()?;
        self.terminated.set();
        Ok(self.slice_number)
    }
}

impl Stream for SliceWriter {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::library_misuse("read on a write-only slice writer"))
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.terminated.check()?;
        let mut offset = 0;
        while offset < buf.len() {
            self.ensure_open()?;
            let remaining = self.config.layout.remaining_in_slice(self.slice_number, self.within);
            let take = match remaining {
                None => buf.len() - offset,
                Some(r) if r == 0 => {
                    // Slice is already exactly full; roll over before writing.
                    self.close_current()?;
                    self.slice_number += 1;
                    if self.config.pause_between_slices {
                        if let Some(hook) = &mut self.on_boundary {
                            hook(self.slice_number);
                        }
                    }
                    continue;
                }
                Some(r) => (buf.len() - offset).min(r as usize),
            };
            self.current.as_mut().unwrap().as_stream().write(&buf[offset..offset + take])?;
            offset += take;
            self.within += take as u64;
            self.position += take as u64;
        }
        Ok(())
    }

    fn skip(&mut self, _pos: u64) -> Result<()> {
        Err(Error::library_misuse("a slice writer only supports sequential appends"))
    }

    fn skip_relative(&mut self, _delta: i64) -> Result<()> {
        Err(Error::library_misuse("a slice writer only supports sequential appends"))
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_position(&self) -> Result<u64> {
        self.terminated.check()?;
        Ok(self.position)
    }

    fn skippable(&self, _direction: SkipDirection, _amount: u64) -> bool {
        false
    }

    fn truncate(&mut self, _pos: u64) -> Result<()> {
        Err(Error::library_misuse("a slice writer cannot be truncated"))
    }

    fn truncatable(&self, _pos: u64) -> bool {
        false
    }

    fn sync_write(&mut self) -> Result<()> {
        self.terminated.check()?;
        if let Some(backing) = &mut self.current {
            backing.as_stream().sync_write()?;
        }
        Ok(())
    }

    fn flush_read(&mut self) -> Result<()> {
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        if self.terminated.is_set() {
            return Err(Error::library_misuse("double-terminate on a slice writer"));
        }
        self.close_current()?;
        self.terminated.set();
        Ok(())
    }

    fn reset_crc(&mut self, width: CrcWidth) {
        if let Some(backing) = &mut self.current {
            backing.as_stream().reset_crc(width);
        }
    }

    fn get_crc(&mut self) -> Option<CrcValue> {
        self.current.as_mut().and_then(|b| b.as_stream().get_crc())
    }
}

/// Reads a single logical stream stitched transparently across numbered
/// slice files.
pub struct SliceReader {
    config: SliceConfig,
    current: Option<LocalFileStream>,
    slice_number: u64,
    position: u64,
    missing_slice_prompt: Option<Box<MissingSlicePrompt>>,
    terminated: Terminated,
}

impl SliceReader {
    /// Open a sliced stream for reading, starting at slice 1.
    pub fn open(config: SliceConfig) -> Result<Self> {
        let mut reader = SliceReader {
            config,
            current: None,
            slice_number: 1,
            position: 0,
            missing_slice_prompt: None,
            terminated: Terminated::default(),
        };
        reader.open_slice(1)?;
        Ok(reader)
    }

    /// Install a hook consulted when a required slice file is missing.
    /// Without one, a missing slice always aborts.
    pub fn with_missing_slice_prompt(mut self, hook: impl Fn(u64, &StdPath) -> MissingSliceDecision + 'static) -> Self {
        self.missing_slice_prompt = Some(Box::new(hook));
        self
    }

    fn open_slice(&mut self, number: u64) -> Result<()> {
        let path = slice_path(&self.config.dir, &self.config.base, &self.config.ext, number);
        loop {
            match LocalFileStream::open_read(&path, false) {
                Ok(file) => {
                    self.current = Some(file);
                    self.slice_number = number;
                    return Ok(());
                }
                Err(e) => {
                    let decision = self
                        .missing_slice_prompt
                        .as_ref()
                        .map(|f| f(number, &path))
                        .unwrap_or(MissingSliceDecision::Abort);
                    match decision {
                        MissingSliceDecision::Retry => continue,
                        MissingSliceDecision::Abort => {
                            return Err(e.push_frame("slice", format!("opening slice {number} at {path:?}")));
                        }
                    }
                }
            }
        }
    }

    /// Total number of slice files found starting from slice 1 — an
    /// `O(N)` probe, used by callers that want an upfront count rather than
    /// discovering the end lazily on read.
    pub fn count_slices(&self) -> u64 {
        let mut n = 1;
        loop {
            let path = slice_path(&self.config.dir, &self.config.base, &self.config.ext, n + 1);
            if !path.exists() {
                return n;
            }
            n += 1;
        }
    }
}

impl Stream for SliceReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.terminated.check()?;
        let mut filled = 0;
        while filled < buf.len() {
            let Some(current) = self.current.as_mut() else {
                break;
            };
            let n = current.read(&mut buf[filled..])?;
            if n == 0 {
                let next_path = slice_path(&self.config.dir, &self.config.base, &self.config.ext, self.slice_number + 1);
                if !next_path.exists() {
                    break;
                }
                self.open_slice(self.slice_number + 1)?;
                continue;
            }
            filled += n;
        }
        self.position += filled as u64;
        Ok(filled)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::library_misuse("write on a read-only slice reader"))
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        let (slice_number, within) = self.config.layout.locate(pos);
        if slice_number != self.slice_number || self.current.is_none() {
            self.open_slice(slice_number)?;
        }
        self.current.as_mut().unwrap().skip(within)?;
        self.position = pos;
        Ok(())
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        let target = if delta >= 0 {
            self.position + delta as u64
        } else {
            self.position.checked_sub((-delta) as u64).ok_or_else(|| Error::range("seek before start of stream"))?
        };
        self.skip(target)
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        self.terminated.check()?;
        loop {
            let mut scratch = [0u8; crate::READ_BUFFER_SIZE];
            if self.read(&mut scratch)? == 0 {
                break;
            }
        }
        Ok(())
    }

    fn get_position(&self) -> Result<u64> {
        self.terminated.check()?;
        Ok(self.position)
    }

    fn skippable(&self, _direction: SkipDirection, _amount: u64) -> bool {
        true
    }

    fn truncate(&mut self, _pos: u64) -> Result<()> {
        Err(Error::library_misuse("a slice reader cannot truncate"))
    }

    fn truncatable(&self, _pos: u64) -> bool {
        false
    }

    fn sync_write(&mut self) -> Result<()> {
        Ok(())
    }

    fn flush_read(&mut self) -> Result<()> {
        self.terminated.check()
    }

    fn terminate(&mut self) -> Result<()> {
        if self.terminated.is_set() {
            return Err(Error::library_misuse("double-terminate on a slice reader"));
        }
        if let Some(mut current) = self.current.take() {
            current.terminate()?;
        }
        self.terminated.set();
        Ok(())
    }

    fn reset_crc(&mut self, width: CrcWidth) {
        if let Some(current) = &mut self.current {
            current.reset_crc(width);
        }
    }

    fn get_crc(&mut self) -> Option<CrcValue> {
        self.current.as_mut().and_then(|c| c.get_crc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_locate_matches_spec_scenario() {
        // 10-slice archive, S0=100, S=200, total 1900 bytes.
        let layout = SliceLayout::new(100, 200);
        let (slice, within) = layout.locate(1500);
        assert_eq!((slice, within), (9, 100));
        assert_eq!(layout.position_of(slice, within), 1500);
    }

    #[test]
    fn layout_roundtrips_every_position() {
        let layout = SliceLayout::new(100, 200);
        for pos in 0..1900u64 {
            let (slice, within) = layout.locate(pos);
            assert_eq!(layout.position_of(slice, within), pos);
        }
    }

    #[test]
    fn writer_splits_exactly_at_boundary() {
        let dir = tempdir().unwrap();
        let config = SliceConfig::sliced(dir.path(), "base", "dar", 10, 10);
        let mut writer = SliceWriter::create(config);
        let data: Vec<u8> = (0u8..=255).cycle().take(25).collect();
        writer.write(&data).unwrap();
        let slices = writer.finish().unwrap();
        assert_eq!(slices, 3);
        assert_eq!(std::fs::read(dir.path().join("base.1.dar")).unwrap().len(), 10);
        assert_eq!(std::fs::read(dir.path().join("base.2.dar")).unwrap().len(), 10);
        assert_eq!(std::fs::read(dir.path().join("base.3.dar")).unwrap().len(), 5);
    }

    #[test]
    fn reader_stitches_across_slices() {
        let dir = tempdir().unwrap();
        let config = SliceConfig::sliced(dir.path(), "base", "dar", 10, 10);
        let mut writer = SliceWriter::create(config);
        let data: Vec<u8> = (0..25u16).map(|i| (i % 256) as u8).collect();
        writer.write(&data).unwrap();
        writer.finish().unwrap();

        let config = SliceConfig::sliced(dir.path(), "base", "dar", 10, 10);
        let mut reader = SliceReader::open(config).unwrap();
        let mut out = vec![0u8; 25];
        reader.read_exact(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn reader_seek_matches_spec_scenario() {
        let dir = tempdir().unwrap();
        let total = 1900usize;
        let data: Vec<u8> = (0..total).map(|i| (i % 256) as u8).collect();
        let config = SliceConfig::sliced(dir.path(), "base", "dar", 100, 200);
        let mut writer = SliceWriter::create(config);
        writer.write(&data).unwrap();
        writer.finish().unwrap();

        let config = SliceConfig::sliced(dir.path(), "base", "dar", 100, 200);
        let mut reader = SliceReader::open(config).unwrap();
        reader.skip(1500).unwrap();
        let mut out = [0u8; 10];
        reader.read_exact(&mut out).unwrap();
        let expected: Vec<u8> = (1500..1510).map(|i| (i % 256) as u8).collect();
        assert_eq!(out.to_vec(), expected);
    }

    #[test]
    fn deny_overwrite_policy_is_honored() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("base.1.dar"), b"existing").unwrap();
        let config = SliceConfig::sliced(dir.path(), "base", "dar", 100, 100);
        let mut writer = SliceWriter::create(config).with_overwrite_policy(|_| OverwriteDecision::Deny);
        assert!(writer.write(b"hello").is_err());
    }

    #[test]
    fn hash_sidecar_is_written_per_slice() {
        let dir = tempdir().unwrap();
        let config =
            SliceConfig::sliced(dir.path(), "base", "dar", 10, 10).with_hash(HashAlgorithm::Sha1);
        let mut writer = SliceWriter::create(config);
        let data: Vec<u8> = (0..20u8).collect();
        writer.write(&data).unwrap();
        writer.finish().unwrap();
        assert!(dir.path().join("base.1.dar.sha1").exists());
        assert!(dir.path().join("base.2.dar.sha1").exists());
        let content = std::fs::read_to_string(dir.path().join("base.2.dar.sha1")).unwrap();
        assert!(content.ends_with("  base.2.dar\n"));
    }
}

//! Pipe stream and seekable-pipe wrapper (§4.D).
//!
//! A [`PipeStream`] wraps a FIFO-like file descriptor: a caller-supplied
//! one, a named pipe opened lazily by path, or an anonymous pipe pair
//! created by the stream itself. Unlike a local file, a pipe cannot seek
//! backward; forward `skip` is emulated by reading and discarding bytes.
//! [`SeekablePipe`] adds the monotone position counter and fixed-size drop
//! buffer that expresses `skip()` as a loop of partial read-and-drop, so
//! higher layers (slice, cipher, codec) see the same [`Stream`] contract
//! they'd get from a local file, minus backward seeking.

use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};

use crate::error::{Error, Result};
use crate::stream::{CrcValue, CrcWidth, Mode, RunningCrc, SkipDirection, Stream, Terminated};

/// Size of the scratch buffer used to discard skipped bytes.
const DROP_BUFFER_SIZE: usize = 65536;

enum Backing {
    /// Wraps a raw fd the caller owns the lifetime of conceptually, but this
    /// stream closes it on terminate — mirrors the source's single-owner
    /// `filedesc` field.
    Fd(std::fs::File),
    /// Anonymous pipe pair created by this stream; `read_end` is exposed so
    /// a child process or writer on the other end can be handed the fd.
    Anonymous { write_end: std::fs::File, read_end: Option<RawFd> },
}

/// A FIFO-backed byte stream.
pub struct PipeStream {
    backing: Backing,
    mode: Mode,
    position: u64,
    peeked: Option<u8>,
    terminated: Terminated,
    crc: RunningCrc,
}

impl PipeStream {
    /// Wrap an already-open file descriptor, inferring mode from its own
    /// open flags is not possible portably in Rust; the caller states it.
    pub fn from_fd(fd: RawFd, mode: Mode) -> Result<Self> {
        if mode == Mode::ReadWrite {
            return Err(Error::range("a pipe cannot be read-write; open it read-only or write-only"));
        }
        if fd < 0 {
            return Err(Error::range("bad file descriptor given to PipeStream::from_fd"));
        }
        // SAFETY: caller guarantees `fd` is a valid, open file descriptor it
        // is transferring ownership of to this stream.
        let file = unsafe { std::fs::File::from_raw_fd(fd) };
        Ok(Self {
            backing: Backing::Fd(file),
            mode,
            position: 0,
            peeked: None,
            terminated: Terminated::default(),
            crc: RunningCrc::Off,
        })
    }

    /// Open a named pipe (FIFO) by path.
    pub fn open_path(path: impl AsRef<std::path::Path>, mode: Mode) -> Result<Self> {
        if mode == Mode::ReadWrite {
            return Err(Error::range("a pipe cannot be read-write"));
        }
        let file = match mode {
            Mode::ReadOnly => std::fs::File::open(path.as_ref()),
            Mode::WriteOnly => std::fs::OpenOptions::new().write(true).open(path.as_ref()),
            Mode::ReadWrite => unreachable!(),
        }
        .map_err(|e| Error::hardware(format!("opening pipe {:?}", path.as_ref()), e))?;
        Ok(Self {
            backing: Backing::Fd(file),
            mode,
            position: 0,
            peeked: None,
            terminated: Terminated::default(),
            crc: RunningCrc::Off,
        })
    }

    /// Create an anonymous pipe pair. This stream is the write end; the
    /// read end's raw fd is available via [`PipeStream::read_end_fd`] until
    /// [`PipeStream::close_read_end`] is called (e.g. after handing it to a
    /// child process).
    pub fn anonymous() -> Result<Self> {
        let mut fds = [0 as RawFd; 2];
        // SAFETY: fds is a valid 2-element array to receive the pipe fds.
        let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if ret != 0 {
            return Err(Error::hardware("creating anonymous pipe", std::io::Error::last_os_error()));
        }
        // SAFETY: fds[0] and fds[1] were just returned by a successful pipe(2).
        let read_end = fds[0];
        let write_end = unsafe { std::fs::File::from_raw_fd(fds[1]) };
        Ok(Self {
            backing: Backing::Anonymous { write_end, read_end: Some(read_end) },
            mode: Mode::WriteOnly,
            position: 0,
            peeked: None,
            terminated: Terminated::default(),
            crc: RunningCrc::Off,
        })
    }

    /// The raw fd of the anonymous pipe's read end, if this stream still
    /// owns it and hasn't closed or released it.
    pub fn read_end_fd(&self) -> Result<RawFd> {
        match &self.backing {
            Backing::Anonymous { read_end: Some(fd), .. } => Ok(*fd),
            Backing::Anonymous { read_end: None, .. } => {
                Err(Error::range("pipe's other end is already closed or released"))
            }
            Backing::Fd(_) => Err(Error::range("pipe's other end is not known for a non-anonymous pipe")),
        }
    }

    /// Close the anonymous pipe's read end (e.g. in the parent after fork).
    pub fn close_read_end(&mut self) -> Result<()> {
        match &mut self.backing {
            Backing::Anonymous { read_end, .. } => {
                if let Some(fd) = read_end.take() {
                    // SAFETY: fd was obtained from a successful pipe(2) and
                    // has not been closed since.
                    unsafe {
                        libc::close(fd);
                    }
                }
                Ok(())
            }
            Backing::Fd(_) => Err(Error::range("pipe's other end is not known for a non-anonymous pipe")),
        }
    }

    /// Stop tracking (without closing) the anonymous pipe's read end, e.g.
    /// after it has been duplicated into a child process across a fork.
    pub fn forget_read_end(&mut self) -> Result<()> {
        match &mut self.backing {
            Backing::Anonymous { read_end, .. } => {
                if read_end.take().is_none() {
                    return Err(Error::range("pipe's other end is not known"));
                }
                Ok(())
            }
            Backing::Fd(_) => Err(Error::range("pipe's other end is not known for a non-anonymous pipe")),
        }
    }

    fn file_mut(&mut self) -> &mut std::fs::File {
        match &mut self.backing {
            Backing::Fd(f) => f,
            Backing::Anonymous { write_end, .. } => write_end,
        }
    }

    /// Peek one byte without consuming it, for a read-only pipe. Returns
    /// whether a next byte is available (false at end-of-stream).
    pub fn has_next_to_read(&mut self) -> Result<bool> {
        self.terminated.check()?;
        if self.peeked.is_some() {
            return Ok(true);
        }
        let mut byte = [0u8; 1];
        let n = self.file_mut().read(&mut byte).map_err(|e| Error::hardware("peeking pipe", e))?;
        if n == 0 {
            return Ok(false);
        }
        self.peeked = Some(byte[0]);
        Ok(true)
    }

    fn read_and_drop(&mut self, mut remaining: u64) -> Result<()> {
        let mut scratch = [0u8; DROP_BUFFER_SIZE];
        while remaining > 0 {
            let chunk = remaining.min(DROP_BUFFER_SIZE as u64) as usize;
            let n = self.read(&mut scratch[..chunk])?;
            if n == 0 {
                return Err(Error::data("pipe ended before the requested forward skip completed"));
            }
            remaining -= n as u64;
        }
        Ok(())
    }
}

impl Stream for PipeStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.terminated.check()?;
        if self.mode == Mode::WriteOnly {
            return Err(Error::library_misuse("read on a write-only pipe"));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let mut filled = 0;
        if let Some(byte) = self.peeked.take() {
            buf[0] = byte;
            filled = 1;
        }
        if filled < buf.len() {
            let n = self.file_mut().read(&mut buf[filled..]).map_err(|e| Error::hardware("reading pipe", e))?;
            filled += n;
        }
        self.position += filled as u64;
        self.crc.update(&buf[..filled]);
        Ok(filled)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.terminated.check()?;
        if self.mode == Mode::ReadOnly {
            return Err(Error::library_misuse("write on a read-only pipe"));
        }
        self.file_mut().write_all(buf).map_err(|e| Error::hardware("writing pipe", e))?;
        self.position += buf.len() as u64;
        self.crc.update(buf);
        Ok(())
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        if pos < self.position {
            return Err(Error::library_misuse("skipping backward is not possible on a pipe"));
        }
        let delta = pos - self.position;
        if delta > 0 {
            self.read_and_drop(delta)?;
        }
        Ok(())
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        self.terminated.check()?;
        if delta < 0 {
            return Err(Error::library_misuse("skipping backward is not possible on a pipe"));
        }
        self.read_and_drop(delta as u64)
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        self.terminated.check()?;
        if self.mode == Mode::WriteOnly {
            return Ok(());
        }
        let mut scratch = [0u8; DROP_BUFFER_SIZE];
        loop {
            let n = self.read(&mut scratch)?;
            if n == 0 {
                break;
            }
        }
        Ok(())
    }

    fn get_position(&self) -> Result<u64> {
        self.terminated.check()?;
        Ok(self.position)
    }

    fn skippable(&self, direction: SkipDirection, _amount: u64) -> bool {
        match self.mode {
            Mode::ReadOnly => direction == SkipDirection::Forward,
            _ => false,
        }
    }

    fn truncate(&mut self, _pos: u64) -> Result<()> {
        Err(Error::library_misuse("a pipe cannot be truncated"))
    }

    fn truncatable(&self, _pos: u64) -> bool {
        false
    }

    fn sync_write(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.file_mut().flush().map_err(|e| Error::hardware("flushing pipe", e))
    }

    fn flush_read(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.peeked = None;
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        if self.terminated.is_set() {
            return Err(Error::library_misuse("double-terminate on a pipe stream"));
        }
        if self.mode != Mode::ReadOnly {
            let _ = self.file_mut().flush();
        }
        if let Backing::Anonymous { read_end, .. } = &mut self.backing {
            if let Some(fd) = read_end.take() {
                // SAFETY: fd came from a successful pipe(2) and has not
                // been closed since.
                unsafe {
                    libc::close(fd);
                }
            }
        }
        self.terminated.set();
        Ok(())
    }

    fn reset_crc(&mut self, width: CrcWidth) {
        self.crc.arm(width);
    }

    fn get_crc(&mut self) -> Option<CrcValue> {
        self.crc.take()
    }
}

impl AsRawFd for PipeStream {
    fn as_raw_fd(&self) -> RawFd {
        match &self.backing {
            Backing::Fd(f) => f.as_raw_fd(),
            Backing::Anonymous { write_end, .. } => write_end.as_raw_fd(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn anonymous_pipe_roundtrip() {
        let writer = PipeStream::anonymous().unwrap();
        let read_fd = writer.read_end_fd().unwrap();
        let mut reader = PipeStream::from_fd(read_fd, Mode::ReadOnly).unwrap();

        let mut writer = writer;
        let handle = thread::spawn(move || {
            writer.write(b"hello pipe").unwrap();
            writer.terminate().unwrap();
        });

        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello pipe");
        handle.join().unwrap();
    }

    #[test]
    fn backward_skip_fails() {
        let writer = PipeStream::anonymous().unwrap();
        let read_fd = writer.read_end_fd().unwrap();
        let mut reader = PipeStream::from_fd(read_fd, Mode::ReadOnly).unwrap();
        assert!(reader.skip_relative(-1).is_err());
        let _ = writer;
    }

    #[test]
    fn forward_skip_drops_bytes() {
        let mut writer = PipeStream::anonymous().unwrap();
        let read_fd = writer.read_end_fd().unwrap();
        let mut reader = PipeStream::from_fd(read_fd, Mode::ReadOnly).unwrap();
        let handle = thread::spawn(move || {
            writer.write(b"0123456789").unwrap();
            writer.terminate().unwrap();
        });
        reader.skip_relative(5).unwrap();
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"56789");
        handle.join().unwrap();
    }
}

//! Local file stream: a [`Stream`] backed by an OS file descriptor (§4.C).
//!
//! Wraps a [`std::fs::File`], adding the fadvise/fsync/ownership/permission
//! operations a plain `File` doesn't expose, plus the furtive-read open mode
//! (`O_NOATIME`) used to read a file without touching its access time.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path as StdPath;

use filetime::FileTime;

use crate::error::{Error, Result};
use crate::stream::{Advice, CrcValue, CrcWidth, Mode, RunningCrc, SkipDirection, Stream, Terminated};
use crate::timestamp::Timestamp;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// `O_NOATIME`, used for furtive reads on Linux. Not defined in `libc` on
/// every target, so it's pinned here the way the source pins it behind a
/// `FURTIVE_READ_MODE_AVAILABLE` compile check.
#[cfg(target_os = "linux")]
const O_NOATIME: i32 = 0o1000000;

/// A local file stream opened for read, write, or read-write access.
pub struct LocalFileStream {
    file: File,
    mode: Mode,
    advice: Advice,
    terminated: Terminated,
    crc: RunningCrc,
}

impl LocalFileStream {
    /// Open an existing file read-only. `furtive` requests `O_NOATIME` where
    /// the platform supports it; unsupported platforms silently degrade to a
    /// normal open rather than failing, per §4.C.
    pub fn open_read(path: impl AsRef<StdPath>, furtive: bool) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true);
        Self::apply_furtive(&mut options, furtive);
        let file = options
            .open(path.as_ref())
            .map_err(|e| Error::hardware(format!("opening {:?} for reading", path.as_ref()), e))?;
        Ok(Self { file, mode: Mode::ReadOnly, advice: Advice::Normal, terminated: Terminated::default(), crc: RunningCrc::Off })
    }

    /// Create (or open) a file for writing. `fail_if_exists` maps to
    /// `O_EXCL`; `erase` maps to `O_TRUNC`.
    pub fn create_write(path: impl AsRef<StdPath>, fail_if_exists: bool, erase: bool) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        options.create_new(fail_if_exists);
        options.truncate(!fail_if_exists && erase);
        let file = options
            .open(path.as_ref())
            .map_err(|e| Error::hardware(format!("opening {:?} for writing", path.as_ref()), e))?;
        Ok(Self { file, mode: Mode::WriteOnly, advice: Advice::Normal, terminated: Terminated::default(), crc: RunningCrc::Off })
    }

    /// Open an existing file for both reading and writing.
    pub fn open_read_write(path: impl AsRef<StdPath>, furtive: bool) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        Self::apply_furtive(&mut options, furtive);
        let file = options
            .open(path.as_ref())
            .map_err(|e| Error::hardware(format!("opening {:?} for read-write", path.as_ref()), e))?;
        Ok(Self { file, mode: Mode::ReadWrite, advice: Advice::Normal, terminated: Terminated::default(), crc: RunningCrc::Off })
    }

    #[cfg(target_os = "linux")]
    fn apply_furtive(options: &mut OpenOptions, furtive: bool) {
        if furtive {
            options.custom_flags(O_NOATIME);
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn apply_furtive(_options: &mut OpenOptions, _furtive: bool) {
        // No O_NOATIME-equivalent on this platform; degrade gracefully.
    }

    /// The mode this stream was opened with.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Advise the OS of the expected access pattern, mapped onto
    /// `posix_fadvise` where available.
    pub fn fadvise(&mut self, advice: Advice) -> Result<()> {
        self.terminated.check()?;
        self.advice = advice;
        #[cfg(target_os = "linux")]
        {
            let fd = self.file.as_raw_fd();
            let posix_advice = match advice {
                Advice::Normal => libc::POSIX_FADV_NORMAL,
                Advice::Sequential => libc::POSIX_FADV_SEQUENTIAL,
                Advice::Random => libc::POSIX_FADV_RANDOM,
                Advice::NoReuse => libc::POSIX_FADV_NOREUSE,
                Advice::WillNeed => libc::POSIX_FADV_WILLNEED,
                Advice::DontNeed => libc::POSIX_FADV_DONTNEED,
            };
            // SAFETY: fd is a valid, open file descriptor owned by `self.file`.
            let ret = unsafe { libc::posix_fadvise(fd, 0, 0, posix_advice) };
            if ret != 0 {
                return Err(Error::hardware("posix_fadvise failed", std::io::Error::from_raw_os_error(ret)));
            }
        }
        Ok(())
    }

    /// Force a data sync of buffered writes to the backing device.
    pub fn fsync(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.file.sync_data().map_err(|e| Error::hardware("fsync", e))
    }

    /// Current file size.
    pub fn size(&self) -> Result<u64> {
        self.terminated.check()?;
        Ok(self.file.metadata().map_err(|e| Error::hardware("stat", e))?.len())
    }

    /// Change ownership, accepting either a symbolic name (resolved through
    /// `getpwnam`/`getgrnam`) or a decimal numeric id as text for either
    /// field. `None` leaves that half unchanged.
    #[cfg(unix)]
    pub fn change_ownership(&mut self, user: Option<&str>, group: Option<&str>) -> Result<()> {
        self.terminated.check()?;
        let uid = user.map(crate::ownership::resolve_uid).transpose()?.unwrap_or(u32::MAX);
        let gid = group.map(crate::ownership::resolve_gid).transpose()?.unwrap_or(u32::MAX);
        let fd = self.file.as_raw_fd();
        // SAFETY: fd is a valid, open file descriptor; -1 for either id leaves it unchanged.
        let ret = unsafe {
            libc::fchown(
                fd,
                if uid == u32::MAX { u32::MAX as libc::uid_t } else { uid },
                if gid == u32::MAX { u32::MAX as libc::gid_t } else { gid },
            )
        };
        if ret != 0 {
            return Err(Error::hardware("fchown", std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Change the Unix permission bits.
    #[cfg(unix)]
    pub fn change_permission(&mut self, mode: u32) -> Result<()> {
        self.terminated.check()?;
        let fd = self.file.as_raw_fd();
        // SAFETY: fd is a valid, open file descriptor.
        let ret = unsafe { libc::fchmod(fd, mode as libc::mode_t) };
        if ret != 0 {
            return Err(Error::hardware("fchmod", std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Restore access and/or modification times on the already-open file, a
    /// `futimens`-style operation used to put a restored file's timestamps
    /// back the way the archived original had them. Either time may be left
    /// `None` to leave it untouched.
    pub fn set_times(&mut self, atime: Option<Timestamp>, mtime: Option<Timestamp>) -> Result<()> {
        self.terminated.check()?;
        let to_filetime = |ts: Timestamp| FileTime::from_unix_time(ts.unix_secs(), ts.sub_second_nanos());
        filetime::set_file_handle_times(&self.file, atime.map(to_filetime), mtime.map(to_filetime))
            .map_err(|e| Error::hardware("restoring file times", e))
    }
}

impl Stream for LocalFileStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.terminated.check()?;
        if self.mode == Mode::WriteOnly {
            return Err(Error::library_misuse("read on a write-only local file stream"));
        }
        let n = self.file.read(buf).map_err(|e| Error::hardware("reading local file", e))?;
        self.crc.update(&buf[..n]);
        if self.advice == Advice::DontNeed && n > 0 {
            let _ = self.fadvise(Advice::DontNeed);
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.terminated.check()?;
        if self.mode == Mode::ReadOnly {
            return Err(Error::library_misuse("write on a read-only local file stream"));
        }
        self.file.write_all(buf).map_err(|e| Error::hardware("writing local file", e))?;
        self.crc.update(buf);
        Ok(())
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        self.file.seek(SeekFrom::Start(pos)).map_err(|e| Error::hardware("seeking local file", e))?;
        Ok(())
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        self.terminated.check()?;
        self.file.seek(SeekFrom::Current(delta)).map_err(|e| Error::hardware("seeking local file", e))?;
        Ok(())
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.file.seek(SeekFrom::End(0)).map_err(|e| Error::hardware("seeking local file", e))?;
        Ok(())
    }

    fn get_position(&self) -> Result<u64> {
        self.terminated.check()?;
        // `Seek::stream_position` requires `&mut`; a local file's position
        // query never actually moves the cursor, so a short-lived clone of
        // the handle keeps the public API on `&self` like every other query.
        let mut clone = self.file.try_clone().map_err(|e| Error::hardware("cloning file handle", e))?;
        clone.stream_position().map_err(|e| Error::hardware("querying local file position", e))
    }

    fn skippable(&self, _direction: SkipDirection, _amount: u64) -> bool {
        true
    }

    fn truncate(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        self.file.set_len(pos).map_err(|e| Error::hardware("truncating local file", e))
    }

    fn truncatable(&self, _pos: u64) -> bool {
        self.mode != Mode::ReadOnly
    }

    fn sync_write(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.file.flush().map_err(|e| Error::hardware("flushing local file", e))
    }

    fn flush_read(&mut self) -> Result<()> {
        self.terminated.check()
    }

    fn terminate(&mut self) -> Result<()> {
        if self.terminated.is_set() {
            return Err(Error::library_misuse("double-terminate on a local file stream"));
        }
        if self.mode != Mode::ReadOnly {
            let _ = self.file.flush();
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        let mut w = LocalFileStream::create_write(&path, false, true).unwrap();
        w.write(b"hello world").unwrap();
        assert_eq!(w.get_position().unwrap(), 11);
        w.terminate().unwrap();

        let mut r = LocalFileStream::open_read(&path, false).unwrap();
        let mut buf = [0u8; 11];
        let n = r.read(&mut buf).unwrap();
        assert_eq!(n, 11);
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn seek_and_truncate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.bin");
        let mut w = LocalFileStream::create_write(&path, false, true).unwrap();
        w.write(b"0123456789").unwrap();
        w.truncate(5).unwrap();
        w.skip(0).unwrap();
        assert_eq!(w.get_position().unwrap(), 0);
        assert_eq!(w.size().unwrap(), 5);
    }

    #[test]
    fn double_terminate_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.bin");
        let mut w = LocalFileStream::create_write(&path, false, true).unwrap();
        w.terminate().unwrap();
        assert!(w.terminate().is_err());
        assert!(w.write(b"x").is_err());
    }

    #[test]
    fn read_only_write_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.bin");
        LocalFileStream::create_write(&path, false, true).unwrap().terminate().unwrap();
        let mut r = LocalFileStream::open_read(&path, false).unwrap();
        assert!(r.write(b"nope").is_err());
    }

    #[test]
    fn set_times_restores_modification_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.bin");
        let mut w = LocalFileStream::create_write(&path, false, true).unwrap();
        w.write(b"restored").unwrap();

        let target = Timestamp::new(1_700_000_000, 0);
        w.set_times(Some(target), Some(target)).unwrap();
        w.terminate().unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        let modified = Timestamp::from_system_time(metadata.modified().unwrap());
        assert_eq!(modified.unix_secs(), target.unix_secs());
    }

    #[test]
    fn running_crc_over_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("e.bin");
        let mut w = LocalFileStream::create_write(&path, false, true).unwrap();
        w.reset_crc(CrcWidth::Crc32);
        w.write(b"Hello, World!").unwrap();
        let crc = w.get_crc();
        assert_eq!(crc, Some(CrcValue::Crc32(0xEC4AC3D0)));
    }
}

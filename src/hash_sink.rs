//! Hashed sink: a write-through stream that computes a sidecar hash (§4.E).
//!
//! [`HashSink`] wraps any write-only [`Stream`] (normally a slice file).
//! Every write is fed to a configurable hash algorithm in addition to being
//! forwarded to the wrapped stream; at [`Stream::terminate`] the digest is
//! written out as a sidecar file: the hex digest, two spaces, the slice's
//! own basename, and a newline — matching the `md5sum`/`sha1sum` line
//! format so the sidecar can be checked with those tools directly.

use std::io::Write as _;
use std::path::PathBuf;

use sha1::Digest as _;

use crate::error::{Error, Result};
use crate::stream::{CrcValue, CrcWidth, Mode, RunningCrc, SkipDirection, Stream, Terminated};

/// Hash algorithm used for a slice's sidecar file. `None` disables hashing
/// entirely: no digest is computed and no sidecar file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// Hashing disabled.
    None,
    /// MD5.
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-512.
    Sha512,
    /// Whirlpool.
    Whirlpool,
    /// Argon2 (id variant), used here as a content digest rather than a
    /// password hash: the accumulated slice bytes stand in for the
    /// password, against a fixed archive-wide salt.
    Argon2,
}

impl HashAlgorithm {
    /// Single-letter sentinel used to record the chosen algorithm in an
    /// archive header, mirroring the per-block compression tags of §4.G.
    pub fn sentinel(self) -> char {
        match self {
            HashAlgorithm::None => 'n',
            HashAlgorithm::Md5 => 'm',
            HashAlgorithm::Sha1 => 's',
            HashAlgorithm::Sha512 => 'S',
            HashAlgorithm::Whirlpool => 'w',
            HashAlgorithm::Argon2 => 'a',
        }
    }

    /// Parse a sentinel written by [`HashAlgorithm::sentinel`].
    pub fn from_sentinel(c: char) -> Result<Self> {
        match c {
            'n' => Ok(HashAlgorithm::None),
            'm' => Ok(HashAlgorithm::Md5),
            's' => Ok(HashAlgorithm::Sha1),
            'S' => Ok(HashAlgorithm::Sha512),
            'w' => Ok(HashAlgorithm::Whirlpool),
            'a' => Ok(HashAlgorithm::Argon2),
            other => Err(Error::data(format!("unknown hash algorithm sentinel '{other}'"))),
        }
    }

    /// Sidecar file extension, per §6: `<slicename>.<hashname>`.
    pub fn extension(self) -> &'static str {
        match self {
            HashAlgorithm::None => "",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Whirlpool => "whirlpool",
            HashAlgorithm::Argon2 => "argon2",
        }
    }
}

/// Fixed salt for the Argon2 content-digest use of §4.E. Not secret — this
/// isn't password hashing, just a way to run Argon2's mixing function over
/// a byte string, so a fixed, documented salt keeps the digest of a given
/// slice reproducible.
#[cfg(feature = "strong-hash")]
const ARGON2_CONTENT_SALT: &[u8; 16] = b"slicevault-slice";

enum Digest {
    None,
    #[cfg(feature = "strong-hash")]
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha512(sha2::Sha512),
    #[cfg(feature = "strong-hash")]
    Whirlpool(whirlpool::Whirlpool),
    #[cfg(feature = "strong-hash")]
    Argon2(Vec<u8>),
}

impl Digest {
    fn new(algorithm: HashAlgorithm) -> Result<Self> {
        Ok(match algorithm {
            HashAlgorithm::None => Digest::None,
            #[cfg(feature = "strong-hash")]
            HashAlgorithm::Md5 => Digest::Md5(md5::Md5::new()),
            HashAlgorithm::Sha1 => Digest::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha512 => Digest::Sha512(sha2::Sha512::new()),
            #[cfg(feature = "strong-hash")]
            HashAlgorithm::Whirlpool => Digest::Whirlpool(whirlpool::Whirlpool::new()),
            #[cfg(feature = "strong-hash")]
            HashAlgorithm::Argon2 => Digest::Argon2(Vec::new()),
            #[cfg(not(feature = "strong-hash"))]
            HashAlgorithm::Md5 | HashAlgorithm::Whirlpool | HashAlgorithm::Argon2 => {
                return Err(Error::feature_unavailable(
                    "this hash algorithm requires the `strong-hash` feature",
                ));
            }
        })
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Digest::None => {}
            #[cfg(feature = "strong-hash")]
            Digest::Md5(h) => h.update(data),
            Digest::Sha1(h) => h.update(data),
            Digest::Sha512(h) => h.update(data),
            #[cfg(feature = "strong-hash")]
            Digest::Whirlpool(h) => h.update(data),
            #[cfg(feature = "strong-hash")]
            Digest::Argon2(buf) => buf.extend_from_slice(data),
        }
    }

    fn finalize(self) -> Result<Option<Vec<u8>>> {
        Ok(match self {
            Digest::None => None,
            #[cfg(feature = "strong-hash")]
            Digest::Md5(h) => Some(h.finalize().to_vec()),
            Digest::Sha1(h) => Some(h.finalize().to_vec()),
            Digest::Sha512(h) => Some(h.finalize().to_vec()),
            #[cfg(feature = "strong-hash")]
            Digest::Whirlpool(h) => Some(h.finalize().to_vec()),
            #[cfg(feature = "strong-hash")]
            Digest::Argon2(buf) => {
                let mut out = [0u8; 32];
                argon2::Argon2::default()
                    .hash_password_into(&buf, ARGON2_CONTENT_SALT, &mut out)
                    .map_err(|e| Error::bug(format!("argon2 content digest failed: {e}")))?;
                Some(out.to_vec())
            }
        })
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// A write-through stream that computes a sidecar hash of everything
/// written to it.
pub struct HashSink<S> {
    inner: S,
    algorithm: HashAlgorithm,
    digest: Option<Digest>,
    sidecar_path: PathBuf,
    slice_basename: String,
    permissions: Option<u32>,
    ownership: Option<(Option<String>, Option<String>)>,
    terminated: Terminated,
    crc: RunningCrc,
}

impl<S: Stream> HashSink<S> {
    /// Wrap `inner`, a write-only stream for a single slice file, so that
    /// every write also feeds `algorithm`'s digest. `sidecar_path` is where
    /// the digest line is written on [`Stream::terminate`] (normally
    /// `<slicename>.<hashname>`, per §6); `slice_basename` is the filename
    /// recorded in that line.
    pub fn new(
        inner: S,
        algorithm: HashAlgorithm,
        sidecar_path: impl Into<PathBuf>,
        slice_basename: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            inner,
            algorithm,
            digest: Some(Digest::new(algorithm)?),
            sidecar_path: sidecar_path.into(),
            slice_basename: slice_basename.into(),
            permissions: None,
            ownership: None,
            terminated: Terminated::default(),
            crc: RunningCrc::Off,
        })
    }

    /// Apply `mode` to the sidecar file once written, matching the data
    /// file's own permissions.
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    /// Apply the given owner/group to the sidecar file once written,
    /// matching the data file's own ownership.
    pub fn with_ownership(mut self, user: Option<String>, group: Option<String>) -> Self {
        self.ownership = Some((user, group));
        self
    }

    fn write_sidecar(&mut self) -> Result<()> {
        let Some(digest) = self.digest.take() else {
            return Ok(());
        };
        let Some(bytes) = digest.finalize()? else {
            return Ok(());
        };
        let mut file = std::fs::File::create(&self.sidecar_path)
            .map_err(|e| Error::hardware(format!("creating hash sidecar {:?}", self.sidecar_path), e))?;
        let line = format!("{}  {}\n", to_hex(&bytes), self.slice_basename);
        file.write_all(line.as_bytes()).map_err(|e| Error::hardware("writing hash sidecar", e))?;
        drop(file);

        #[cfg(unix)]
        {
            if let Some(mode) = self.permissions {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(mode);
                std::fs::set_permissions(&self.sidecar_path, perms)
                    .map_err(|e| Error::hardware("setting hash sidecar permissions", e))?;
            }
            if let Some((user, group)) = &self.ownership {
                let uid = user.as_deref().map(crate::ownership::resolve_uid).transpose()?;
                let gid = group.as_deref().map(crate::ownership::resolve_gid).transpose()?;
                let c_path = std::ffi::CString::new(self.sidecar_path.as_os_str().as_encoded_bytes())
                    .map_err(|_| Error::range("sidecar path contains a NUL byte"))?;
                // SAFETY: c_path is a valid, NUL-terminated path string.
                let ret = unsafe {
                    libc::chown(
                        c_path.as_ptr(),
                        uid.unwrap_or(u32::MAX) as libc::uid_t,
                        gid.unwrap_or(u32::MAX) as libc::gid_t,
                    )
                };
                if ret != 0 {
                    return Err(Error::hardware("chown on hash sidecar", std::io::Error::last_os_error()));
                }
            }
        }
        Ok(())
    }
}

impl<S: Stream> Stream for HashSink<S> {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::library_misuse("read on a write-only hash sink"))
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.terminated.check()?;
        if let Some(digest) = &mut self.digest {
            digest.update(buf);
        }
        self.crc.update(buf);
        self.inner.write(buf)
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.inner.skip(pos)
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        self.inner.skip_relative(delta)
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        self.inner.skip_to_eof()
    }

    fn get_position(&self) -> Result<u64> {
        self.inner.get_position()
    }

    fn skippable(&self, direction: SkipDirection, amount: u64) -> bool {
        self.inner.skippable(direction, amount)
    }

    fn truncate(&mut self, pos: u64) -> Result<()> {
        self.inner.truncate(pos)
    }

    fn truncatable(&self, pos: u64) -> bool {
        self.inner.truncatable(pos)
    }

    fn sync_write(&mut self) -> Result<()> {
        self.inner.sync_write()
    }

    fn flush_read(&mut self) -> Result<()> {
        self.inner.flush_read()
    }

    fn terminate(&mut self) -> Result<()> {
        if self.terminated.is_set() {
            return Err(Error::library_misuse("double-terminate on a hash sink"));
        }
        self.inner.terminate()?;
        self.write_sidecar()?;
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

// Match `mode()` on wrapped streams that expose it (local file, pipe) for
// callers that need to distinguish read/write sinks generically; a hash
// sink is always write-only by construction (§4.E only hashes writes).
impl<S> HashSink<S> {
    /// Always [`Mode::WriteOnly`] — a hash sink only ever wraps a write path.
    pub fn mode(&self) -> Mode {
        Mode::WriteOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_file::LocalFileStream;
    use tempfile::tempdir;

    #[test]
    fn sha1_sidecar_matches_known_digest() {
        let dir = tempdir().unwrap();
        let data_path = dir.path().join("base.2.ext");
        let sidecar_path = dir.path().join("base.2.ext.sha1");
        let file = LocalFileStream::create_write(&data_path, false, true).unwrap();
        let mut sink = HashSink::new(file, HashAlgorithm::Sha1, &sidecar_path, "base.2.ext").unwrap();
        sink.write(b"Hello, World!").unwrap();
        sink.terminate().unwrap();

        let content = std::fs::read_to_string(&sidecar_path).unwrap();
        let digest = sha1::Sha1::digest(b"Hello, World!");
        let expected = format!("{}  base.2.ext\n", to_hex(&digest));
        assert_eq!(content, expected);
    }

    #[test]
    fn none_algorithm_writes_no_sidecar() {
        let dir = tempdir().unwrap();
        let data_path = dir.path().join("base.1.ext");
        let sidecar_path = dir.path().join("base.1.ext.none");
        let file = LocalFileStream::create_write(&data_path, false, true).unwrap();
        let mut sink = HashSink::new(file, HashAlgorithm::None, &sidecar_path, "base.1.ext").unwrap();
        sink.write(b"data").unwrap();
        sink.terminate().unwrap();
        assert!(!sidecar_path.exists());
    }

    #[test]
    fn sentinel_roundtrip() {
        for algo in [
            HashAlgorithm::None,
            HashAlgorithm::Md5,
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha512,
            HashAlgorithm::Whirlpool,
            HashAlgorithm::Argon2,
        ] {
            assert_eq!(HashAlgorithm::from_sentinel(algo.sentinel()).unwrap(), algo);
        }
    }
}

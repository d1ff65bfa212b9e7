//! Block cipher stream (§4.J): turns an encryption-block-oriented
//! sequential byte stream into a random-access one.
//!
//! Every clear block, regardless of how much of it is actually occupied by
//! caller data, is padded to a fixed `padded_size` before encryption (the
//! "elastic buffer", see [`mod@self`] docs below), so ciphertext block `n`
//! always starts at byte `n * padded_size` in the underlying stream. Random
//! reads need no side index: [`CipherReader::skip`] maps a logical position
//! straight to `(block_index, offset)` and decrypts only that one block.
//!
//! Per §3's Cipher context and §4.J's key schedule, writing is inherently
//! sequential (an archive is produced once, start to finish), so only
//! [`CipherWriter`] is write-mode; [`CipherReader`] is the random-access
//! read side, mirroring the Compressor/Decompressor split of
//! [`crate::codec::stream`].
//!
//! Elastic buffer layout (format-defined per §4.J; this crate's choice): the
//! padded block reserves one whole extra cipher block beyond the
//! clear-block capacity; the first 8 bytes of that reserved block hold the
//! actual clear length as a big-endian `u64`, the rest is unused fill. A
//! reader decrypts the block, reads those 8 bytes, and recovers the real
//! clear length without touching the data region.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::stream::{CrcValue, CrcWidth, RunningCrc, SkipDirection, Stream, Terminated};

/// A passphrase used to derive cipher key material. Zeroized on drop.
#[derive(Clone)]
pub struct Password {
    inner: Zeroizing<String>,
}

impl Password {
    /// Wrap a passphrase.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Password { inner: Zeroizing::new(passphrase.into()) }
    }

    fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password").field("len", &self.inner.len()).finish()
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Password::new(s)
    }
}

impl From<String> for Password {
    fn from(s: String) -> Self {
        Password::new(s)
    }
}

/// Archive format version, relevant here only for the ESSIV cipher choice
/// (§4.J: "V ≥ 8.1 or A ≠ blowfish" selects SHA-256/AES-256 over the legacy
/// SHA-1/blowfish pairing). The full archive-version field (including its
/// legacy 3-byte on-disk encoding) belongs to the catalog/header layer,
/// which is out of this crate's scope; this type carries only the
/// comparison the cipher layer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveVersion {
    major: u8,
    minor: u8,
}

impl ArchiveVersion {
    /// Construct a version from its major/minor components.
    pub const fn new(major: u8, minor: u8) -> Self {
        ArchiveVersion { major, minor }
    }

    /// The threshold below which legacy ESSIV parameters apply to blowfish.
    pub const V8_1: ArchiveVersion = ArchiveVersion::new(8, 1);
}

/// Block cipher algorithm (§4.J parameter `A`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    /// Legacy variable-key cipher; 8-byte blocks.
    Blowfish,
    /// AES with a 256-bit key; 16-byte blocks.
    Aes256,
    /// Twofish with a 256-bit key; 16-byte blocks.
    Twofish256,
    /// Serpent with a 256-bit key; 16-byte blocks.
    Serpent256,
    /// Camellia with a 256-bit key; 16-byte blocks.
    Camellia256,
}

impl CipherAlgorithm {
    fn block_size(self) -> usize {
        match self {
            CipherAlgorithm::Blowfish => 8,
            _ => 16,
        }
    }

    /// `max_key_len(A)` from §4.J's key schedule: 56 bytes for blowfish
    /// (legacy compatibility), 32 bytes (256-bit) for every other member.
    fn max_key_len(self) -> usize {
        match self {
            CipherAlgorithm::Blowfish => 56,
            CipherAlgorithm::Aes256
            | CipherAlgorithm::Twofish256
            | CipherAlgorithm::Serpent256
            | CipherAlgorithm::Camellia256 => 32,
        }
    }

    fn cbc_encrypt(self, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
        match self {
            CipherAlgorithm::Blowfish => cbc_encrypt::<blowfish::Blowfish>(key, iv, data),
            CipherAlgorithm::Aes256 => cbc_encrypt::<aes::Aes256>(key, iv, data),
            CipherAlgorithm::Twofish256 => cbc_encrypt::<twofish::Twofish>(key, iv, data),
            CipherAlgorithm::Serpent256 => cbc_encrypt::<serpent::Serpent>(key, iv, data),
            CipherAlgorithm::Camellia256 => cbc_encrypt::<camellia::Camellia256>(key, iv, data),
        }
    }

    fn cbc_decrypt(self, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
        match self {
            CipherAlgorithm::Blowfish => cbc_decrypt::<blowfish::Blowfish>(key, iv, data),
            CipherAlgorithm::Aes256 => cbc_decrypt::<aes::Aes256>(key, iv, data),
            CipherAlgorithm::Twofish256 => cbc_decrypt::<twofish::Twofish>(key, iv, data),
            CipherAlgorithm::Serpent256 => cbc_decrypt::<serpent::Serpent>(key, iv, data),
            CipherAlgorithm::Camellia256 => cbc_decrypt::<camellia::Camellia256>(key, iv, data),
        }
    }
}

/// Which cipher protects the ESSIV salt key, per §4.J step 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EssivCipher {
    Aes256,
    Blowfish,
}

impl EssivCipher {
    fn encrypt_block(self, key: &[u8], block: &mut [u8]) -> Result<()> {
        match self {
            EssivCipher::Aes256 => ecb_encrypt_block::<aes::Aes256>(key, block),
            EssivCipher::Blowfish => ecb_encrypt_block::<blowfish::Blowfish>(key, block),
        }
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()>
where
    C: KeyInit + BlockEncryptMut,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::range("invalid cipher key or IV length"))?;
    encryptor
        .encrypt_padded_mut::<NoPadding>(data, data.len())
        .map_err(|e| Error::data(format!("block cipher encryption failed: {e}")))?;
    Ok(())
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()>
where
    C: KeyInit + BlockDecryptMut,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::range("invalid cipher key or IV length"))?;
    decryptor
        .decrypt_padded_mut::<NoPadding>(data)
        .map_err(|e| Error::data(format!("block cipher decryption failed (corrupted data): {e}")))?;
    Ok(())
}

fn ecb_encrypt_block<C>(key: &[u8], block: &mut [u8]) -> Result<()>
where
    C: KeyInit + BlockEncrypt,
{
    let cipher = C::new_from_slice(key).map_err(|_| Error::range("invalid ESSIV key length"))?;
    let mut ga = cipher::generic_array::GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut ga);
    block.copy_from_slice(&ga);
    Ok(())
}

/// Tunable knobs for a cipher stream, following the crate's `*Options`
/// builder convention.
#[derive(Debug, Clone, Copy)]
pub struct CipherOptions {
    algorithm: CipherAlgorithm,
    version: ArchiveVersion,
    iterations: u32,
    clear_block_size: usize,
}

impl CipherOptions {
    /// Default PBKDF2 iteration count (§4.J: `I` defaults to 2000).
    pub const DEFAULT_ITERATIONS: u32 = 2000;
    /// Default clear block size.
    pub const DEFAULT_CLEAR_BLOCK_SIZE: usize = 10240;

    /// Start from `algorithm` with every other parameter at its default.
    pub fn new(algorithm: CipherAlgorithm) -> Self {
        CipherOptions {
            algorithm,
            version: ArchiveVersion::V8_1,
            iterations: Self::DEFAULT_ITERATIONS,
            clear_block_size: Self::DEFAULT_CLEAR_BLOCK_SIZE,
        }
    }

    /// Set the archive version (affects ESSIV parameter selection).
    pub fn version(mut self, version: ArchiveVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the PBKDF2 iteration count.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Set the clear block size (`Bclear`).
    pub fn clear_block_size(mut self, size: usize) -> Self {
        self.clear_block_size = size.max(1);
        self
    }
}

/// Derived key schedule for a cipher stream (§4.J steps 1-3), shared by
/// [`CipherWriter`] and [`CipherReader`].
struct CipherContext {
    algorithm: CipherAlgorithm,
    key1: Zeroizing<Vec<u8>>,
    key2: Zeroizing<Vec<u8>>,
    essiv_cipher: EssivCipher,
    bcipher: usize,
    bclear: usize,
    padded_size: usize,
}

impl CipherContext {
    fn derive(password: &Password, options: &CipherOptions) -> Result<Self> {
        let algorithm = options.algorithm;
        let bcipher = algorithm.block_size();

        let mut key1 = Zeroizing::new(vec![0u8; algorithm.max_key_len()]);
        pbkdf2_hmac::<Sha1>(password.as_bytes(), b"", options.iterations, &mut key1);

        let legacy_blowfish = algorithm == CipherAlgorithm::Blowfish && options.version < ArchiveVersion::V8_1;
        let (essiv_cipher, key2): (EssivCipher, Zeroizing<Vec<u8>>) = if legacy_blowfish {
            (EssivCipher::Blowfish, Zeroizing::new(Sha1::digest(&key1).to_vec()))
        } else {
            (EssivCipher::Aes256, Zeroizing::new(Sha256::digest(&key1).to_vec()))
        };

        // Reserve one whole extra cipher block beyond the rounded-up clear
        // capacity for the elastic-buffer footer (§4.J:
        // `ceil(Bclear/Bcipher + 1)·Bcipher`).
        let padded_size = (options.clear_block_size.div_ceil(bcipher) + 1) * bcipher;

        Ok(CipherContext {
            algorithm,
            key1,
            key2,
            essiv_cipher,
            bcipher,
            bclear: options.clear_block_size,
            padded_size,
        })
    }

    fn iv_for_block(&self, block_index: u64) -> Result<Vec<u8>> {
        // `bcipher` is always at least 8 (the smallest supported cipher
        // block size, blowfish's), so the 8-byte index always fits in the
        // low-order bytes of the block-sized buffer.
        let mut iv = vec![0u8; self.bcipher];
        let tail = iv.len() - 8;
        iv[tail..].copy_from_slice(&block_index.to_be_bytes());
        self.essiv_cipher.encrypt_block(&self.key2, &mut iv)?;
        Ok(iv)
    }

    fn encrypt_block(&self, block_index: u64, clear: &[u8]) -> Result<Vec<u8>> {
        debug_assert!(clear.len() <= self.bclear);
        let mut padded = vec![0u8; self.padded_size];
        padded[..clear.len()].copy_from_slice(clear);
        padded[self.padded_size - 8..].copy_from_slice(&(clear.len() as u64).to_be_bytes());
        let iv = self.iv_for_block(block_index)?;
        self.algorithm.cbc_encrypt(&self.key1, &iv, &mut padded)?;
        Ok(padded)
    }

    /// Decrypt one padded ciphertext block in place, returning the
    /// original clear-data length recovered from the elastic buffer.
    fn decrypt_block(&self, block_index: u64, padded: &mut [u8]) -> Result<usize> {
        if padded.len() != self.padded_size {
            return Err(Error::data("cipher block has unexpected length"));
        }
        let iv = self.iv_for_block(block_index)?;
        self.algorithm.cbc_decrypt(&self.key1, &iv, padded)?;
        let clear_len = u64::from_be_bytes(padded[self.padded_size - 8..].try_into().unwrap()) as usize;
        if clear_len > self.bclear {
            return Err(Error::data("elastic buffer declares a clear length larger than the block size"));
        }
        Ok(clear_len)
    }
}

/// Write-mode half of §4.J: buffers clear data up to `Bclear` bytes per
/// block and encrypts+writes each full block to the underlying stream.
/// Writing is sequential; see [`mod@self`] docs for why only this half
/// needs to support write at all.
pub struct CipherWriter<W> {
    inner: W,
    ctx: CipherContext,
    buffer: Vec<u8>,
    block_index: u64,
    position: u64,
    terminated: Terminated,
    crc: RunningCrc,
}

impl<W: Stream> CipherWriter<W> {
    /// Wrap `inner`, deriving the key schedule from `password` and `options`.
    pub fn new(inner: W, password: &Password, options: &CipherOptions) -> Result<Self> {
        let ctx = CipherContext::derive(password, options)?;
        Ok(CipherWriter {
            inner,
            ctx,
            buffer: Vec::new(),
            block_index: 0,
            position: 0,
            terminated: Terminated::default(),
            crc: RunningCrc::default(),
        })
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.buffer.is_empty() && self.block_index > 0 {
            return Ok(());
        }
        let padded = self.ctx.encrypt_block(self.block_index, &self.buffer)?;
        self.inner.write(&padded)?;
        self.block_index += 1;
        self.buffer.clear();
        Ok(())
    }

    /// Consume the writer, flushing the final (possibly partial) block and
    /// returning the underlying stream. Always emits at least one block,
    /// even for an empty clear stream, so a reader always finds the
    /// elastic-buffer footer it needs.
    pub fn finish(mut self) -> Result<W> {
        self.flush_block()?;
        self.terminated.set();
        Ok(self.inner)
    }
}

impl<W: Stream> Stream for CipherWriter<W> {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::library_misuse("CipherWriter is write-only"))
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.terminated.check()?;
        self.crc.update(buf);
        self.position += buf.len() as u64;
        let mut offset = 0;
        while offset < buf.len() {
            let room = self.ctx.bclear - self.buffer.len();
            let take = room.min(buf.len() - offset);
            self.buffer.extend_from_slice(&buf[offset..offset + take]);
            offset += take;
            if self.buffer.len() == self.ctx.bclear {
                self.flush_block()?;
            }
        }
        Ok(())
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        if pos != self.position {
            return Err(Error::library_misuse("CipherWriter only supports flush-in-place seeking"));
        }
        self.flush_block()
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        if delta == 0 {
            return self.flush_block();
        }
        Err(Error::library_misuse("CipherWriter cannot seek while writing"))
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
        Err(Error::library_misuse("CipherWriter does not support truncate"))
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

/// Read-mode half of §4.J: true random access, since IV depends only on
/// block index. `skip(pos)` never needs to replay anything — it maps
/// straight to `(block_index, offset)` and the next `read` decrypts that
/// one block on demand.
pub struct CipherReader<R> {
    inner: R,
    ctx: CipherContext,
    cached_block: Option<u64>,
    cached_clear: Vec<u8>,
    position: u64,
    total_len: Option<u64>,
    terminated: Terminated,
    crc: RunningCrc,
}

impl<R: Stream> CipherReader<R> {
    /// Wrap `inner`, deriving the key schedule from `password` and `options`.
    pub fn new(inner: R, password: &Password, options: &CipherOptions) -> Result<Self> {
        let ctx = CipherContext::derive(password, options)?;
        Ok(CipherReader {
            inner,
            ctx,
            cached_block: None,
            cached_clear: Vec::new(),
            position: 0,
            total_len: None,
            terminated: Terminated::default(),
            crc: RunningCrc::default(),
        })
    }

    fn load_block(&mut self, block_index: u64) -> Result<()> {
        if self.cached_block == Some(block_index) {
            return Ok(());
        }
        self.inner.skip(block_index * self.ctx.padded_size as u64)?;
        let mut padded = vec![0u8; self.ctx.padded_size];
        self.inner.read_exact(&mut padded)?;
        let clear_len = self.ctx.decrypt_block(block_index, &mut padded)?;
        padded.truncate(clear_len);
        self.cached_clear = padded;
        self.cached_block = Some(block_index);
        Ok(())
    }

    /// Total clear-data length, probed lazily from the underlying stream's
    /// own end-of-stream position (cached after the first call).
    fn total_len(&mut self) -> Result<u64> {
        if let Some(len) = self.total_len {
            return Ok(len);
        }
        let saved = self.inner.get_position()?;
        self.inner.skip_to_eof()?;
        let ciphertext_len = self.inner.get_position()?;
        self.inner.skip(saved)?;

        let len = if ciphertext_len == 0 {
            0
        } else {
            if ciphertext_len % self.ctx.padded_size as u64 != 0 {
                return Err(Error::data("cipher stream length is not a multiple of the padded block size"));
            }
            let num_blocks = ciphertext_len / self.ctx.padded_size as u64;
            self.load_block(num_blocks - 1)?;
            (num_blocks - 1) * self.ctx.bclear as u64 + self.cached_clear.len() as u64
        };
        self.total_len = Some(len);
        Ok(len)
    }
}

impl<R: Stream> Stream for CipherReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.terminated.check()?;
        let total = self.total_len()?;
        if self.position >= total {
            return Ok(0);
        }
        let block_index = self.position / self.ctx.bclear as u64;
        let in_block_offset = (self.position % self.ctx.bclear as u64) as usize;
        self.load_block(block_index)?;
        let available = &self.cached_clear[in_block_offset.min(self.cached_clear.len())..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n as u64;
        self.crc.update(&buf[..n]);
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::library_misuse("CipherReader is read-only"))
    }

    fn skip(&mut self, pos: u64) -> Result<()> {
        self.terminated.check()?;
        self.position = pos;
        Ok(())
    }

    fn skip_relative(&mut self, delta: i64) -> Result<()> {
        self.terminated.check()?;
        self.position = if delta >= 0 {
            self.position + delta as u64
        } else {
            self.position.checked_sub((-delta) as u64).ok_or_else(|| Error::range("seek before start"))?
        };
        Ok(())
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        self.terminated.check()?;
        self.position = self.total_len()?;
        Ok(())
    }

    fn get_position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn skippable(&self, _direction: SkipDirection, _amount: u64) -> bool {
        true
    }

    fn truncate(&mut self, _pos: u64) -> Result<()> {
        Err(Error::library_misuse("CipherReader does not support truncate"))
    }

    fn truncatable(&self, _pos: u64) -> bool {
        false
    }

    fn sync_write(&mut self) -> Result<()> {
        Ok(())
    }

    fn flush_read(&mut self) -> Result<()> {
        self.cached_block = None;
        self.cached_clear.clear();
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
            let n = (self.data.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<()> {
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
        let password = Password::new("secret");
        let options = CipherOptions::new(CipherAlgorithm::Aes256).clear_block_size(64);

        let mut writer = CipherWriter::new(MemStream::new(), &password, &options).unwrap();
        let input: Vec<u8> = (0u8..200).collect();
        writer.write(&input).unwrap();
        let backing = writer.finish().unwrap();

        let mut reader = CipherReader::new(backing, &password, &options).unwrap();
        let mut out = vec![0u8; input.len()];
        reader.read_exact(&mut out).unwrap();
        assert_eq!(out, input);
    }

    /// §8 scenario: encrypt 4 blocks of 512 bytes with aes256 and passphrase
    /// "secret", seek to block index 2, read 100 bytes, compare against
    /// direct encryption of block 2 then decryption.
    #[test]
    fn random_access_read_matches_direct_block_decryption() {
        let password = Password::new("secret");
        let options = CipherOptions::new(CipherAlgorithm::Aes256).clear_block_size(512);

        let blocks: Vec<Vec<u8>> =
            (0..4u8).map(|b| vec![b; 512]).collect();

        let mut writer = CipherWriter::new(MemStream::new(), &password, &options).unwrap();
        for block in &blocks {
            writer.write(block).unwrap();
        }
        let backing = writer.finish().unwrap();

        let mut reader = CipherReader::new(backing, &password, &options).unwrap();
        reader.skip(2 * 512).unwrap();
        let mut out = vec![0u8; 100];
        reader.read_exact(&mut out).unwrap();
        assert_eq!(&out[..], &blocks[2][..100]);
    }

    #[test]
    fn wrong_password_fails_to_decrypt_cleanly() {
        let options = CipherOptions::new(CipherAlgorithm::Aes256).clear_block_size(64);
        let mut writer = CipherWriter::new(MemStream::new(), &Password::new("right"), &options).unwrap();
        writer.write(b"some clear data to protect").unwrap();
        let backing = writer.finish().unwrap();

        let mut reader = CipherReader::new(backing, &Password::new("wrong"), &options).unwrap();
        let mut out = vec![0u8; 27];
        // Garbage decryption either fails outright or produces different
        // bytes; either is an acceptable wrong-password outcome here.
        match reader.read_exact(&mut out) {
            Ok(()) => assert_ne!(&out[..], b"some clear data to protect"),
            Err(_) => {}
        }
    }

    #[test]
    fn pbkdf2_hmac_sha1_matches_rfc3962_vectors() {
        let mut out = [0u8; 16];
        pbkdf2_hmac::<Sha1>(b"password", b"ATHENA.MIT.EDUraeburn", 1, &mut out);
        assert_eq!(out, [
            0xcd, 0xed, 0xb5, 0x28, 0x1b, 0xb2, 0xf8, 0x01, 0x56, 0x5a, 0x11, 0x22, 0xb2, 0x56,
            0x35, 0x15,
        ]);

        let mut out = [0u8; 16];
        pbkdf2_hmac::<Sha1>(b"password", b"ATHENA.MIT.EDUraeburn", 2, &mut out);
        assert_eq!(out, [
            0x01, 0xdb, 0xee, 0x7f, 0x4a, 0x9e, 0x24, 0x3e, 0x98, 0x8b, 0x62, 0xc7, 0x3c, 0xda,
            0x93, 0x5d,
        ]);
    }
}

//! # slicevault
//!
//! A stacked byte-stream pipeline for seekable, sliced, compressed and
//! encrypted archives.
//!
//! The crate is built as a stack of `Stream` adapters: a local file or pipe
//! at the bottom, a slice layer splitting one logical stream across several
//! volume files, a block cipher layer with ESSIV random access, and a block
//! compression layer (single-threaded or parallel) on top. Each layer only
//! depends on the `Stream` trait of the layer below it, so they compose in
//! any order the caller needs.
//!
//! ## Quick Start
//!
//! ### Reading a sliced, compressed stream
//!
//! ```rust,no_run
//! use slicevault::{Result, slice::{SliceConfig, SliceReader}, stream::Stream};
//!
//! fn main() -> Result<()> {
//!     let config = SliceConfig::sliced(".", "archive", "dar", 10_485_760, 10_485_760);
//!     let mut reader = SliceReader::open(config)?;
//!     let mut buf = [0u8; 4096];
//!     let n = reader.read(&mut buf)?;
//!     println!("read {} bytes", n);
//!     Ok(())
//! }
//! ```
//!
//! ### Writing a sliced stream with per-slice hash sidecars
//!
//! ```rust,no_run
//! use slicevault::{Result, hash_sink::HashAlgorithm, slice::{SliceConfig, SliceWriter}, stream::Stream};
//!
//! fn main() -> Result<()> {
//!     let config = SliceConfig::sliced(".", "archive", "dar", 10_485_760, 10_485_760)
//!         .with_hash(HashAlgorithm::Sha1);
//!     let mut writer = SliceWriter::create(config);
//!     writer.write(b"payload bytes")?;
//!     writer.finish()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `lzma` | Yes | LZMA (xz) block compression |
//! | `deflate` | Yes | Deflate/gzip block compression |
//! | `bzip2` | Yes | BZip2 block compression |
//! | `lzo` | Yes | LZO block compression |
//! | `lz4` | No | LZ4 block compression |
//! | `zstd` | No | Zstandard block compression |
//! | `aes` | Yes | Block cipher stream (AES/Blowfish/Twofish/Serpent/Camellia) with ESSIV |
//! | `parallel` | Yes | Multi-threaded block compression pipeline |
//! | `linux-fsa` | No | Filesystem-specific-attribute bridging on Linux |
//! | `strong-hash` | No | MD5/SHA-2/Whirlpool/Argon2 slice hash sidecars |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. [`Error`] carries a frame stack: lower
//! layers push context as an error rises through the stream stack without
//! discarding the original cause.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default buffer size used throughout the stream stack for intermediate copies.
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod bigint;
pub mod cancel;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod fsa;
pub mod hash_sink;
pub mod local_file;
pub mod ownership;
pub mod path;
pub mod pipe;
pub mod slice;
pub mod stream;
pub mod timestamp;

#[cfg(feature = "aes")]
#[cfg_attr(docsrs, doc(cfg(feature = "aes")))]
pub mod cipher;

#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
pub mod parallel;

pub use bigint::BigInt;
pub use error::{Error, Result};
pub use path::Path;
pub use stream::Stream;
pub use timestamp::Timestamp;

#[cfg(feature = "aes")]
pub use cipher::Password;

//! Error taxonomy and frame-stacking for the stream pipeline.
//!
//! This module provides the [`Error`] enum covering the closed set of error
//! kinds the pipeline can raise, plus a [`Result<T>`] alias. Every error
//! carries a stack of `(source, message)` frames: as an error rises through
//! a stack of stream adapters (slice, cipher, codec, local file), each layer
//! pushes a frame identifying itself without discarding the frames pushed by
//! layers below it.
//!
//! ```rust
//! use slicevault::error::{Error, Result};
//!
//! fn inner() -> Result<()> {
//!     Err(Error::data("bad magic number")).context("codec", "reading block header")
//! }
//!
//! fn outer() -> Result<()> {
//!     inner().context("slice", "opening volume 3")
//! }
//!
//! match outer() {
//!     Err(e) => assert_eq!(e.frames().len(), 2),
//!     Ok(()) => unreachable!(),
//! }
//! ```

use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A single `(source, message)` frame in an error's context stack.
///
/// `source` names the component that pushed the frame (e.g. `"slice"`,
/// `"cipher"`, `"codec"`); `message` is a human-readable description of what
/// that component was doing when the error passed through it.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Component that pushed this frame.
    pub source: String,
    /// What the component was doing.
    pub message: String,
}

/// Why a cooperative-cancellation error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelKind {
    /// Cancellation must take effect at the next opportunity.
    Immediate,
    /// Cancellation takes effect once the current atomic unit of work completes.
    Delayed,
}

impl std::fmt::Display for CancelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Delayed => write!(f, "delayed"),
        }
    }
}

/// The closed set of error kinds the pipeline can raise (§7).
///
/// Each variant is constructed with a single top-level `(source, message)`
/// frame already on the stack; further frames are added with
/// [`Result::context`] as the error rises through the stream stack.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Argument out of range.
    #[error("range error: {message}")]
    Range {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// Allocation failure, including secure (zeroizing) allocations.
    #[error("memory error: {message}")]
    Memory {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// Detected data corruption: bad magic, failed decompression, elastic
    /// buffer overflow, or a short read where a full block was expected.
    #[error("data error: {message}")]
    Data {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// I/O error reported by a backend (file, pipe, network).
    #[error("hardware error: {message}")]
    Hardware {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
        /// The underlying I/O error, when one is available.
        #[source]
        source: Option<io::Error>,
    },

    /// A runtime code path was reached that corresponds to a feature not
    /// compiled into this build (e.g. a codec behind a disabled feature).
    #[error("feature unavailable: {message}")]
    FeatureUnavailable {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// The user declined at an interactive prompt.
    #[error("user aborted: {message}")]
    UserAbort {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// An external script exited with a non-zero status.
    #[error("script failed (exit {exit_code}): {message}")]
    Script {
        /// Exit code of the external script.
        exit_code: i32,
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// The library's API was used incorrectly (double-terminate, wrong mode).
    #[error("library misuse: {message}")]
    LibraryMisuse {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// A BigInt operation overflowed a bounded build's configured limit.
    #[error("big integer overflow: {message}")]
    BigInteger {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// Cooperative cancellation was observed.
    #[error("thread cancelled ({kind}, user-requested: {user_requested}): {message}")]
    ThreadCancel {
        /// Whether cancellation is immediate or delayed to the next checkpoint.
        kind: CancelKind,
        /// Whether the cancellation was requested by the user (vs. internally).
        user_requested: bool,
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// An internal invariant was violated; this should be unreachable.
    #[error("internal bug: {message}")]
    Bug {
        /// Description of the frame stack.
        message: String,
        /// Context frames, innermost first.
        frames: Vec<Frame>,
    },

    /// End of file, used internally by codecs and slice readers as a
    /// distinguishable signal rather than a user-facing failure.
    #[error("end of file")]
    EndOfFile,
}

impl Error {
    /// Construct a [`Error::Range`] with no frames yet.
    pub fn range(message: impl Into<String>) -> Self {
        Error::Range { message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::Memory`] with no frames yet.
    pub fn memory(message: impl Into<String>) -> Self {
        Error::Memory { message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::Data`] with no frames yet.
    pub fn data(message: impl Into<String>) -> Self {
        Error::Data { message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::Hardware`] wrapping an I/O error.
    pub fn hardware(message: impl Into<String>, source: io::Error) -> Self {
        Error::Hardware { message: message.into(), frames: Vec::new(), source: Some(source) }
    }

    /// Construct a [`Error::FeatureUnavailable`] with no frames yet.
    pub fn feature_unavailable(message: impl Into<String>) -> Self {
        Error::FeatureUnavailable { message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::UserAbort`] with no frames yet.
    pub fn user_abort(message: impl Into<String>) -> Self {
        Error::UserAbort { message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::LibraryMisuse`] with no frames yet.
    pub fn library_misuse(message: impl Into<String>) -> Self {
        Error::LibraryMisuse { message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::BigInteger`] with no frames yet.
    pub fn big_integer(message: impl Into<String>) -> Self {
        Error::BigInteger { message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::ThreadCancel`] with no frames yet.
    pub fn thread_cancel(kind: CancelKind, user_requested: bool, message: impl Into<String>) -> Self {
        Error::ThreadCancel { kind, user_requested, message: message.into(), frames: Vec::new() }
    }

    /// Construct a [`Error::Bug`] with no frames yet.
    pub fn bug(message: impl Into<String>) -> Self {
        Error::Bug { message: message.into(), frames: Vec::new() }
    }

    /// The frame stack accumulated on this error so far, innermost first.
    pub fn frames(&self) -> &[Frame] {
        match self {
            Error::Range { frames, .. }
            | Error::Memory { frames, .. }
            | Error::Data { frames, .. }
            | Error::Hardware { frames, .. }
            | Error::FeatureUnavailable { frames, .. }
            | Error::UserAbort { frames, .. }
            | Error::Script { frames, .. }
            | Error::LibraryMisuse { frames, .. }
            | Error::BigInteger { frames, .. }
            | Error::ThreadCancel { frames, .. }
            | Error::Bug { frames, .. } => frames,
            Error::EndOfFile => &[],
        }
    }

    /// Push a `(source, message)` frame identifying a layer this error just
    /// passed through. No-op on [`Error::EndOfFile`], which never carries
    /// context since it is a control signal, not a user-facing failure.
    pub fn push_frame(mut self, source: impl Into<String>, message: impl Into<String>) -> Self {
        let frame = Frame { source: source.into(), message: message.into() };
        match &mut self {
            Error::Range { frames, .. }
            | Error::Memory { frames, .. }
            | Error::Data { frames, .. }
            | Error::Hardware { frames, .. }
            | Error::FeatureUnavailable { frames, .. }
            | Error::UserAbort { frames, .. }
            | Error::Script { frames, .. }
            | Error::LibraryMisuse { frames, .. }
            | Error::BigInteger { frames, .. }
            | Error::ThreadCancel { frames, .. }
            | Error::Bug { frames, .. } => frames.push(frame),
            Error::EndOfFile => {}
        }
        self
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            return Error::EndOfFile;
        }
        Error::hardware(e.to_string(), e)
    }
}

/// Extension trait adding `.context(source, message)` to any `Result<T, Error>`.
///
/// Mirrors the propagation policy of §7: layers push a frame identifying
/// themselves without discarding the frames already on the stack.
pub trait ResultExt<T> {
    /// Push a `(source, message)` frame onto the error, if any.
    fn context(self, source: impl Into<String>, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, source: impl Into<String>, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.push_frame(source, message))
    }
}

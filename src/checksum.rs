//! Checksum computation utilities.
//!
//! This module provides CRC-32 and CRC-64 checksum computation for the
//! running CRC a [`crate::stream::Stream`] can arm on read or write, and for
//! the per-slice digests the slice layer can emit as hash sidecar files.
//!
//! # CRC-32
//!
//! CRC-32 uses the IEEE 802.3 polynomial and is the default width for a
//! stream's running CRC.
//!
//! # CRC-64
//!
//! CRC-64-ECMA is provided for extended verification scenarios:
//! - High-integrity verification scenarios
//! - Large file verification where CRC-32 collision risk matters
//!
//! # Example
//!
//! ```rust
//! use slicevault::checksum::{Crc32, Crc64, Checksum};
//!
//! // CRC-32
//! let mut crc32 = Crc32::new();
//! crc32.update(b"Hello, ");
//! crc32.update(b"World!");
//! let value = crc32.finalize();
//!
//! // CRC-64
//! let mut crc64 = Crc64::new();
//! crc64.update(b"Hello, World!");
//! let value = crc64.finalize();
//!
//! // One-shot computation
//! let crc32 = Crc32::compute(b"Hello, World!");
//! let crc64 = Crc64::compute(b"Hello, World!");
//! ```

/// Common trait for checksum computation.
pub trait Checksum: Default + Clone {
    /// The output type of this checksum.
    type Output: Copy + Eq + std::fmt::Debug;

    /// Creates a new checksum calculator.
    fn new() -> Self;

    /// Updates the checksum with additional data.
    fn update(&mut self, data: &[u8]);

    /// Finishes the checksum computation and returns the value.
    fn finalize(&self) -> Self::Output;

    /// Resets the checksum to its initial state.
    fn reset(&mut self);

    /// Computes the checksum of a single slice in one call.
    fn compute(data: &[u8]) -> Self::Output {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

/// CRC-32 checksum calculator.
///
/// Uses the IEEE 802.3 polynomial, the default width a [`crate::stream::Stream`]
/// arms its running CRC at.
///
/// # Example
///
/// ```rust
/// use slicevault::checksum::{Crc32, Checksum};
///
/// // Incremental computation
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ");
/// crc.update(b"World!");
/// assert_eq!(crc.finalize(), 0xEC4AC3D0);
///
/// // One-shot computation
/// let crc = Crc32::compute(b"Hello, World!");
/// assert_eq!(crc, 0xEC4AC3D0);
/// ```
#[derive(Clone)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32")
            .field("current", &self.hasher.clone().finalize())
            .finish()
    }
}

impl Checksum for Crc32 {
    type Output = u32;

    fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    fn finalize(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    fn reset(&mut self) {
        self.hasher.reset();
    }
}

/// CRC-64 checksum calculator.
///
/// Uses the ECMA-182 polynomial. Available as a stronger-than-CRC-32
/// alternative for a stream's running CRC or a slice's hash sidecar.
///
/// # When to Use CRC-64
///
/// CRC-32 has a collision probability of approximately 1 in 4 billion,
/// which becomes significant for:
/// - Very large files (terabytes)
/// - High-integrity applications
/// - Storage systems handling many files
///
/// CRC-64 reduces collision probability to approximately 1 in 2^64.
///
/// # Example
///
/// ```rust
/// use slicevault::checksum::{Crc64, Checksum};
///
/// let crc = Crc64::compute(b"Hello, World!");
/// println!("CRC-64: {:016x}", crc);
/// ```
#[derive(Clone)]
pub struct Crc64 {
    hasher: crc64fast::Digest,
}

impl Default for Crc64 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc64")
            .field("current", &self.hasher.sum64())
            .finish()
    }
}

impl Checksum for Crc64 {
    type Output = u64;

    fn new() -> Self {
        Self {
            hasher: crc64fast::Digest::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.hasher.write(data);
    }

    fn finalize(&self) -> u64 {
        self.hasher.sum64()
    }

    fn reset(&mut self) {
        self.hasher = crc64fast::Digest::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_basic() {
        let crc = Crc32::compute(b"Hello, World!");
        // CRC-32 IEEE 802.3 (ISO 3309) value
        assert_eq!(crc, 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_empty() {
        let crc = Crc32::compute(b"");
        assert_eq!(crc, 0);
    }

    #[test]
    fn test_crc32_incremental() {
        let mut hasher = Crc32::new();
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        assert_eq!(hasher.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_reset() {
        let mut hasher = Crc32::new();
        hasher.update(b"test");
        hasher.reset();
        hasher.update(b"Hello, World!");
        assert_eq!(hasher.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc64_basic() {
        let crc = Crc64::compute(b"Hello, World!");
        // Note: exact value depends on polynomial
        assert!(crc != 0);
    }

    #[test]
    fn test_crc64_empty() {
        let crc = Crc64::compute(b"");
        assert_eq!(crc, 0);
    }

    #[test]
    fn test_crc64_incremental() {
        let mut hasher = Crc64::new();
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        let incremental = hasher.finalize();

        let oneshot = Crc64::compute(b"Hello, World!");
        assert_eq!(incremental, oneshot);
    }

    #[test]
    fn test_checksum_trait() {
        fn compute_checksum<C: Checksum>(data: &[u8]) -> C::Output {
            C::compute(data)
        }

        let crc32 = compute_checksum::<Crc32>(b"test");
        let crc64 = compute_checksum::<Crc64>(b"test");

        assert!(crc32 != 0);
        assert!(crc64 != 0);
    }
}

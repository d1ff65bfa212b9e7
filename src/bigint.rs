//! Unbounded non-negative integer with a self-delimiting wire form.
//!
//! [`BigInt`] backs every length, offset, timestamp and bitmask value carried
//! by the stream stack. It stores its value as little-endian byte limbs
//! (`Vec<u8>`), canonicalized so the most significant limb is always nonzero
//! (the empty vector represents zero).
//!
//! # Wire form
//!
//! ```text
//! [ Z zero bytes ] [ marker byte, exactly one bit set ] [ V value bytes, little-endian ]
//! ```
//!
//! `marker = 0x80 >> bit_index` for some `bit_index` in `0..8`; the number of
//! 4-byte groups making up the value is `groups = Z * 8 + bit_index`, and
//! `V = groups * 4`. Zero is the single reserved case `Z == 0, marker ==
//! 0x80`, carrying no value bytes at all — every nonzero value needs at
//! least one full group (4 value bytes), so this combination can never
//! arise from the general encoding and is unambiguous on read.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Width in bytes of one length group in the wire form.
const GROUP_BYTES: usize = 4;

/// An unbounded non-negative integer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BigInt {
    /// Little-endian limbs; canonical form has no trailing zero limb.
    limbs: Vec<u8>,
}

impl BigInt {
    /// The value zero.
    pub fn zero() -> Self {
        BigInt { limbs: Vec::new() }
    }

    /// Whether this value is zero.
    pub fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    /// Drop trailing (most-significant) zero limbs so the representation is
    /// canonical.
    fn canonicalize(mut self) -> Self {
        while self.limbs.last() == Some(&0) {
            self.limbs.pop();
        }
        self
    }

    /// Construct from a little-endian byte slice.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        BigInt { limbs: bytes.to_vec() }.canonicalize()
    }

    /// Return the value as little-endian bytes, canonical (no trailing zero byte).
    pub fn to_le_bytes(&self) -> &[u8] {
        &self.limbs
    }

    /// Number of groups of [`GROUP_BYTES`] needed to hold the canonical value.
    fn groups(&self) -> usize {
        if self.is_zero() {
            0
        } else {
            self.limbs.len().div_ceil(GROUP_BYTES)
        }
    }

    /// Encode to the self-delimiting wire form.
    pub fn to_wire(&self) -> Vec<u8> {
        if self.is_zero() {
            return vec![0x80];
        }
        let groups = self.groups();
        let z = groups / 8;
        let bit_index = groups % 8;
        let marker = 0x80u8 >> bit_index;
        let value_len = groups * GROUP_BYTES;

        let mut out = Vec::with_capacity(z + 1 + value_len);
        out.resize(z, 0);
        out.push(marker);
        out.extend_from_slice(&self.limbs);
        out.resize(z + 1 + value_len, 0);
        out
    }

    /// Write the wire form to `w`.
    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        w.write_all(&self.to_wire()).map_err(|e| Error::hardware("writing bigint", e))?;
        Ok(())
    }

    /// Read the wire form from `r`.
    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        let mut byte = [0u8; 1];
        let mut z = 0usize;
        let marker = loop {
            match r.read(&mut byte) {
                Ok(0) => return Err(Error::data("end of file within bigint preamble")),
                Ok(_) => {}
                Err(e) => return Err(Error::hardware("reading bigint preamble", e)),
            }
            if byte[0] == 0 {
                z += 1;
                continue;
            }
            break byte[0];
        };

        if z == 0 && marker == 0x80 {
            return Ok(BigInt::zero());
        }

        if marker.count_ones() != 1 {
            return Err(Error::data(format!(
                "malformed bigint marker byte {marker:#04x}: more than one bit set"
            )));
        }
        let bit_index = marker.leading_zeros() as usize;
        let groups = z * 8 + bit_index;
        let value_len = groups * GROUP_BYTES;

        let mut value = vec![0u8; value_len];
        r.read_exact(&mut value).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::data("truncated bigint value field"),
            _ => Error::hardware("reading bigint value", e),
        })?;
        Ok(BigInt::from_le_bytes(&value))
    }

    /// Drain the least-significant bytes of `self` into `acc`, up to `T`'s
    /// maximum representable value, decrementing `self` by the amount
    /// transferred. Used to bridge a [`BigInt`] into a bounded native
    /// integer buffer a few bytes at a time.
    pub fn unstack<T: Unstackable>(&mut self, acc: &mut T) {
        let taken = acc.absorb_le(&self.limbs);
        if taken == 0 {
            return;
        }
        self.limbs.drain(0..taken);
        *self = std::mem::take(self).canonicalize();
    }

    /// Bridge into a bounded `u64`, failing with [`Error::big_integer`] if
    /// the value doesn't fit — the "length-overflow error" of §4.A for a
    /// bounded build. Built on [`BigInt::unstack`], the same primitive a
    /// caller would use to drain an arbitrarily large value a few bytes at
    /// a time.
    pub fn to_u64(&self) -> Result<u64> {
        let mut acc: u64 = 0;
        let mut rest = self.clone();
        rest.unstack(&mut acc);
        if !rest.is_zero() {
            return Err(Error::big_integer("value does not fit in a 64-bit bounded integer"));
        }
        Ok(acc)
    }

    fn from_u128(mut v: u128) -> Self {
        let mut limbs = Vec::new();
        while v > 0 {
            limbs.push((v & 0xff) as u8);
            v >>= 8;
        }
        BigInt { limbs }
    }

    fn to_u128(&self) -> Option<u128> {
        if self.limbs.len() > 16 {
            return None;
        }
        let mut v: u128 = 0;
        for (i, &b) in self.limbs.iter().enumerate() {
            v |= (b as u128) << (8 * i);
        }
        Some(v)
    }
}

macro_rules! impl_from_native {
    ($($t:ty),+) => {
        $(impl From<$t> for BigInt {
            fn from(v: $t) -> Self {
                BigInt::from_u128(v as u128)
            }
        })+
    };
}
impl_from_native!(u8, u16, u32, u64, u128, usize);

/// Types that can absorb little-endian bytes up to their own maximum value,
/// for use with [`BigInt::unstack`].
pub trait Unstackable: Copy {
    /// Absorb as many leading little-endian bytes of `bytes` as fit without
    /// overflowing `self`'s type, adding them to `self`. Returns the number
    /// of bytes consumed.
    fn absorb_le(&mut self, bytes: &[u8]) -> usize;
}

macro_rules! impl_unstackable {
    ($($t:ty),+) => {
        $(impl Unstackable for $t {
            fn absorb_le(&mut self, bytes: &[u8]) -> usize {
                let width = std::mem::size_of::<$t>();
                let take = bytes.len().min(width);
                let mut v: $t = 0;
                for (i, &b) in bytes[..take].iter().enumerate() {
                    v |= (b as $t) << (8 * i);
                }
                *self = v;
                take
            }
        })+
    };
}
impl_unstackable!(u8, u16, u32, u64, u128);

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.limbs.len().cmp(&other.limbs.len()) {
            std::cmp::Ordering::Equal => self.limbs.iter().rev().cmp(other.limbs.iter().rev()),
            ord => ord,
        }
    }
}

impl std::ops::Add for &BigInt {
    type Output = BigInt;
    fn add(self, rhs: &BigInt) -> BigInt {
        let mut out = Vec::with_capacity(self.limbs.len().max(rhs.limbs.len()) + 1);
        let mut carry = 0u16;
        for i in 0..self.limbs.len().max(rhs.limbs.len()) {
            let a = *self.limbs.get(i).unwrap_or(&0) as u16;
            let b = *rhs.limbs.get(i).unwrap_or(&0) as u16;
            let sum = a + b + carry;
            out.push((sum & 0xff) as u8);
            carry = sum >> 8;
        }
        if carry > 0 {
            out.push(carry as u8);
        }
        BigInt { limbs: out }.canonicalize()
    }
}

impl std::ops::Sub for &BigInt {
    type Output = BigInt;
    /// Panics (as an internal bug) if `rhs` is greater than `self`; callers
    /// must not subtract past zero, matching the unsigned BigInt invariant.
    fn sub(self, rhs: &BigInt) -> BigInt {
        assert!(self >= rhs, "BigInt subtraction underflow");
        let mut out = Vec::with_capacity(self.limbs.len());
        let mut borrow = 0i16;
        for i in 0..self.limbs.len() {
            let a = *self.limbs.get(i).unwrap_or(&0) as i16;
            let b = *rhs.limbs.get(i).unwrap_or(&0) as i16;
            let mut diff = a - b - borrow;
            if diff < 0 {
                diff += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out.push(diff as u8);
        }
        BigInt { limbs: out }.canonicalize()
    }
}

impl std::ops::Mul for &BigInt {
    type Output = BigInt;
    fn mul(self, rhs: &BigInt) -> BigInt {
        if self.is_zero() || rhs.is_zero() {
            return BigInt::zero();
        }
        let mut out = vec![0u16; self.limbs.len() + rhs.limbs.len()];
        for (i, &a) in self.limbs.iter().enumerate() {
            let mut carry = 0u32;
            for (j, &b) in rhs.limbs.iter().enumerate() {
                let prod = out[i + j] as u32 + a as u32 * b as u32 + carry;
                out[i + j] = (prod & 0xff) as u16;
                carry = prod >> 8;
            }
            let mut k = i + rhs.limbs.len();
            while carry > 0 {
                let sum = out[k] as u32 + carry;
                out[k] = (sum & 0xff) as u16;
                carry = sum >> 8;
                k += 1;
            }
        }
        BigInt { limbs: out.into_iter().map(|b| b as u8).collect() }.canonicalize()
    }
}

impl BigInt {
    /// Euclidean division, returning `(quotient, remainder)`.
    pub fn div_rem(&self, divisor: &BigInt) -> Result<(BigInt, BigInt)> {
        if divisor.is_zero() {
            return Err(Error::range("division by zero"));
        }
        let mut remainder = BigInt::zero();
        let mut quotient_bits = vec![0u8; self.limbs.len().max(1)];
        for byte_idx in (0..self.limbs.len()).rev() {
            for bit in (0..8).rev() {
                remainder = &(&remainder << 1) | &BigInt::from(((self.limbs[byte_idx] >> bit) & 1) as u8);
                if &remainder >= divisor {
                    remainder = &remainder - divisor;
                    quotient_bits[byte_idx] |= 1 << bit;
                }
            }
        }
        Ok((BigInt { limbs: quotient_bits }.canonicalize(), remainder))
    }
}

impl std::ops::BitAnd for &BigInt {
    type Output = BigInt;
    fn bitand(self, rhs: &BigInt) -> BigInt {
        let len = self.limbs.len().min(rhs.limbs.len());
        let limbs = (0..len).map(|i| self.limbs[i] & rhs.limbs[i]).collect();
        BigInt { limbs }.canonicalize()
    }
}

impl std::ops::BitOr for &BigInt {
    type Output = BigInt;
    fn bitor(self, rhs: &BigInt) -> BigInt {
        let len = self.limbs.len().max(rhs.limbs.len());
        let limbs =
            (0..len).map(|i| self.limbs.get(i).unwrap_or(&0) | rhs.limbs.get(i).unwrap_or(&0)).collect();
        BigInt { limbs }.canonicalize()
    }
}

impl std::ops::BitXor for &BigInt {
    type Output = BigInt;
    fn bitxor(self, rhs: &BigInt) -> BigInt {
        let len = self.limbs.len().max(rhs.limbs.len());
        let limbs =
            (0..len).map(|i| self.limbs.get(i).unwrap_or(&0) ^ rhs.limbs.get(i).unwrap_or(&0)).collect();
        BigInt { limbs }.canonicalize()
    }
}

impl std::ops::Shl<u32> for &BigInt {
    type Output = BigInt;
    fn shl(self, bits: u32) -> BigInt {
        if self.is_zero() {
            return BigInt::zero();
        }
        let whole_bytes = (bits / 8) as usize;
        let rem_bits = bits % 8;
        let mut limbs = vec![0u8; whole_bytes];
        limbs.extend_from_slice(&self.limbs);
        if rem_bits > 0 {
            let mut carry = 0u16;
            for limb in limbs.iter_mut().skip(whole_bytes) {
                let shifted = ((*limb as u16) << rem_bits) | carry;
                *limb = (shifted & 0xff) as u8;
                carry = shifted >> 8;
            }
            if carry > 0 {
                limbs.push(carry as u8);
            }
        }
        BigInt { limbs }.canonicalize()
    }
}

impl std::ops::Shr<u32> for &BigInt {
    type Output = BigInt;
    fn shr(self, bits: u32) -> BigInt {
        let whole_bytes = (bits / 8) as usize;
        if whole_bytes >= self.limbs.len() {
            return BigInt::zero();
        }
        let rem_bits = bits % 8;
        let mut limbs: Vec<u8> = self.limbs[whole_bytes..].to_vec();
        if rem_bits > 0 {
            let mut carry = 0u8;
            for limb in limbs.iter_mut().rev() {
                let new_carry = *limb << (8 - rem_bits);
                *limb = (*limb >> rem_bits) | carry;
                carry = new_carry;
            }
        }
        BigInt { limbs }.canonicalize()
    }
}

impl std::fmt::Display for BigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_u128() {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "<{}-byte bigint>", self.limbs.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(v: BigInt) {
        let wire = v.to_wire();
        let decoded = BigInt::read_from(&mut Cursor::new(wire)).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn zero_is_one_byte_0x80() {
        let wire = BigInt::zero().to_wire();
        assert_eq!(wire, vec![0x80]);
    }

    #[test]
    fn roundtrip_scenarios() {
        roundtrip(BigInt::zero());
        roundtrip(BigInt::from(1u8));
        roundtrip(BigInt::from(255u8));
        roundtrip(BigInt::from(256u32));
        roundtrip(BigInt::from(1u128 << 32));
        roundtrip(BigInt::from((1u128 << 64) + 1));
    }

    #[test]
    fn canonical_encoding_is_unique() {
        let a = BigInt::from(256u32);
        let b = BigInt::from_le_bytes(&[0, 1, 0, 0]);
        assert_eq!(a, b);
        assert_eq!(a.to_wire(), b.to_wire());
    }

    #[test]
    fn add_sub_mul() {
        let a = BigInt::from(1_000_000u64);
        let b = BigInt::from(3_000_000u64);
        assert_eq!(&a + &b, BigInt::from(4_000_000u64));
        assert_eq!(&b - &a, BigInt::from(2_000_000u64));
        assert_eq!(&a * &b, BigInt::from(3_000_000_000_000u64));
    }

    #[test]
    fn div_rem_matches_native() {
        let a = BigInt::from(100u32);
        let b = BigInt::from(7u32);
        let (q, r) = a.div_rem(&b).unwrap();
        assert_eq!(q, BigInt::from(14u32));
        assert_eq!(r, BigInt::from(2u32));
    }

    #[test]
    fn shifts() {
        let a = BigInt::from(1u32);
        assert_eq!(&a << 10, BigInt::from(1024u32));
        let b = BigInt::from(1024u32);
        assert_eq!(&b >> 10, BigInt::from(1u32));
    }

    #[test]
    fn unstack_drains_least_significant_bytes() {
        let mut big = BigInt::from((1u128 << 40) + 5);
        let mut acc: u32 = 0;
        big.unstack(&mut acc);
        assert!(!big.is_zero());
    }

    #[test]
    fn ordering() {
        assert!(BigInt::from(1u8) < BigInt::from(2u8));
        assert!(BigInt::from(256u32) > BigInt::from(255u8));
    }

    #[test]
    fn to_u64_round_trips_values_that_fit() {
        assert_eq!(BigInt::zero().to_u64().unwrap(), 0);
        assert_eq!(BigInt::from(42u32).to_u64().unwrap(), 42);
        assert_eq!(BigInt::from(u64::MAX).to_u64().unwrap(), u64::MAX);
    }

    #[test]
    fn to_u64_overflows_on_values_that_do_not_fit() {
        let huge = BigInt::from(1u128 << 70);
        assert!(huge.to_u64().is_err());
    }
}

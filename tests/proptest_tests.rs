//! Property-based tests for the testable invariants of spec §8: BigInt
//! round-trip, slice position↔(slice, offset) invertibility, codec
//! round-trip, and path subdir symmetry.

use proptest::prelude::*;
use slicevault::BigInt;
use slicevault::codec::Algorithm;
use slicevault::path::Path;
use slicevault::slice::SliceLayout;
use std::io::Cursor;

proptest! {
    /// `decode(encode(v)) == v` for every `u64` value, including the
    /// concrete scenario values (0, 1, 255, 256, 2^32).
    #[test]
    fn bigint_round_trips_every_u64(v in any::<u64>()) {
        let value = BigInt::from(v);
        let wire = value.to_wire();
        let mut cursor = Cursor::new(wire);
        let decoded = BigInt::read_from(&mut cursor).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(decoded.to_u64().unwrap(), v);
    }

    /// Canonical encoding is unique: encoding the same value twice produces
    /// identical wire bytes.
    #[test]
    fn bigint_encoding_is_deterministic(v in any::<u64>()) {
        let a = BigInt::from(v).to_wire();
        let b = BigInt::from(v).to_wire();
        prop_assert_eq!(a, b);
    }

    /// For every slice layout and logical position, `locate` then
    /// `position_of` is the identity (§8 testable property 5).
    #[test]
    fn slice_layout_locate_is_invertible(
        first_slice_size in 1u64..10_000,
        slice_size in 1u64..10_000,
        pos in 0u64..1_000_000,
    ) {
        let layout = SliceLayout::new(first_slice_size, slice_size);
        let (slice, within) = layout.locate(pos);
        prop_assert_eq!(layout.position_of(slice, within), pos);
    }

    /// The uncompressed-passthrough codec round-trips arbitrary buffers,
    /// the simplest instance of §8's "for every codec C and buffer b ...
    /// decompress(compress(b)) == b".
    #[test]
    fn copy_codec_round_trips(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let codec = Algorithm::None.block_codec(0).unwrap();
        let mut compressed = vec![0u8; codec.min_output_buffer_for(data.len())];
        let n = codec.compress(&data, &mut compressed).unwrap();
        compressed.truncate(n);
        let mut restored = vec![0u8; data.len()];
        let m = codec.decompress(&compressed, &mut restored).unwrap();
        restored.truncate(m);
        prop_assert_eq!(restored, data);
    }

    /// Mutual subdirectory containment implies path equality (§8 testable
    /// property: `(p.is_subdir_of(q) && q.is_subdir_of(p)) => p.display() ==
    /// q.display()`).
    #[test]
    fn mutual_subdir_implies_equal_display(
        parts in proptest::collection::vec("[a-z][a-z0-9]{0,6}", 1..5),
    ) {
        let joined = parts.join("/");
        let p = Path::new(&joined).unwrap();
        let q = Path::new(&joined).unwrap();
        if p.is_subdir_of(&q, true) && q.is_subdir_of(&p, true) {
            prop_assert_eq!(p.display(), q.display());
        }
    }
}

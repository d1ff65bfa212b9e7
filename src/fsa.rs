//! Filesystem-specific attribute set: a portable value set for extX/HFS+
//! flags, serialized into archives (§4.K).
//!
//! An [`FsaSet`] is an ordered collection of [`FsaEntry`] values, each a
//! `(family, nature, value)` triple — at most one entry per `(family,
//! nature)` pair, sorted on disk by that same key. [`FsaScope`] controls
//! which families a filesystem bridge reads from or writes to; the bridge
//! itself (behind the `linux-fsa` feature) only exercises the
//! `linux-extX` family, since HFS+ birthtime has no Linux equivalent to
//! read it from.

use std::io::{Read, Write};

use crate::bigint::BigInt;
use crate::error::{Error, Result};

/// Which filesystem family an [`FsaEntry`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FsaFamily {
    /// HFS+ (macOS) attributes.
    HfsPlus,
    /// Linux ext2/ext3/ext4 attributes.
    LinuxExtX,
}

impl FsaFamily {
    /// One-letter wire tag (§4.K): `h` for HFS+, `l` for ext*.
    pub fn sentinel(self) -> u8 {
        match self {
            FsaFamily::HfsPlus => b'h',
            FsaFamily::LinuxExtX => b'l',
        }
    }

    /// Parse a wire tag written by [`FsaFamily::sentinel`]. `X` is reserved
    /// for a future family and fails as an unknown-feature error, per §4.K.
    pub fn from_sentinel(tag: u8) -> Result<Self> {
        match tag {
            b'h' => Ok(FsaFamily::HfsPlus),
            b'l' => Ok(FsaFamily::LinuxExtX),
            b'X' => Err(Error::feature_unavailable("reserved FSA family sentinel 'X'")),
            other => Err(Error::data(format!("unknown FSA family sentinel {:?}", other as char))),
        }
    }
}

impl std::fmt::Display for FsaFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsaFamily::HfsPlus => write!(f, "HFS+"),
            FsaFamily::LinuxExtX => write!(f, "ext2/3/4"),
        }
    }
}

/// Which attribute an [`FsaEntry`] carries, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FsaNature {
    /// Creation date (HFS+ `st_birthtime`).
    CreationDate,
    /// Append-only flag.
    AppendOnly,
    /// Transparent filesystem compression flag.
    Compressed,
    /// No-dump flag (excluded from `dump(8)` backups).
    NoDump,
    /// Immutable flag.
    Immutable,
    /// Data-journalling flag.
    DataJournalling,
    /// Secure-deletion flag.
    SecureDeletion,
    /// No-tail-merging flag.
    NoTailMerging,
    /// Undeletable flag.
    Undeletable,
    /// No-atime-update flag.
    NoatimeUpdate,
    /// Synchronous-directory-updates flag.
    SynchronousDir,
    /// Synchronous-updates flag.
    SynchronousUpdate,
    /// Top-of-directory-hierarchy hint flag.
    TopOfDirHierarchy,
}

impl FsaNature {
    /// Two-letter wire tag (§4.K). Values follow the original
    /// `aa`/`ba`/`bb`/... allocation order, not alphabetic order by name.
    pub fn sentinel(self) -> [u8; 2] {
        match self {
            FsaNature::CreationDate => *b"aa",
            FsaNature::AppendOnly => *b"ba",
            FsaNature::Compressed => *b"bb",
            FsaNature::NoDump => *b"bc",
            FsaNature::Immutable => *b"bd",
            FsaNature::DataJournalling => *b"be",
            FsaNature::SecureDeletion => *b"bf",
            FsaNature::NoTailMerging => *b"bg",
            FsaNature::Undeletable => *b"bh",
            FsaNature::NoatimeUpdate => *b"bi",
            FsaNature::SynchronousDir => *b"bj",
            FsaNature::SynchronousUpdate => *b"bk",
            FsaNature::TopOfDirHierarchy => *b"bl",
        }
    }

    /// Parse a wire tag written by [`FsaNature::sentinel`]. `XX` is
    /// reserved for a future nature and fails as an unknown-feature error.
    pub fn from_sentinel(tag: [u8; 2]) -> Result<Self> {
        match &tag {
            b"aa" => Ok(FsaNature::CreationDate),
            b"ba" => Ok(FsaNature::AppendOnly),
            b"bb" => Ok(FsaNature::Compressed),
            b"bc" => Ok(FsaNature::NoDump),
            b"bd" => Ok(FsaNature::Immutable),
            b"be" => Ok(FsaNature::DataJournalling),
            b"bf" => Ok(FsaNature::SecureDeletion),
            b"bg" => Ok(FsaNature::NoTailMerging),
            b"bh" => Ok(FsaNature::Undeletable),
            b"bi" => Ok(FsaNature::NoatimeUpdate),
            b"bj" => Ok(FsaNature::SynchronousDir),
            b"bk" => Ok(FsaNature::SynchronousUpdate),
            b"bl" => Ok(FsaNature::TopOfDirHierarchy),
            b"XX" => Err(Error::feature_unavailable("reserved FSA nature sentinel 'XX'")),
            other => Err(Error::data(format!(
                "unknown FSA nature sentinel {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Whether this nature belongs to the given family. Used to reject
    /// cross-family nonsense (e.g. `CreationDate` under `LinuxExtX`) on
    /// construction rather than on the filesystem bridge.
    pub fn valid_for(self, family: FsaFamily) -> bool {
        match family {
            FsaFamily::HfsPlus => matches!(self, FsaNature::CreationDate),
            FsaFamily::LinuxExtX => !matches!(self, FsaNature::CreationDate),
        }
    }
}

impl std::fmt::Display for FsaNature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FsaNature::CreationDate => "creation date",
            FsaNature::AppendOnly => "append-only",
            FsaNature::Compressed => "compressed",
            FsaNature::NoDump => "no dump flag",
            FsaNature::Immutable => "immutable",
            FsaNature::DataJournalling => "data journalling",
            FsaNature::SecureDeletion => "secure deletion",
            FsaNature::NoTailMerging => "no tail merging",
            FsaNature::Undeletable => "undeletable",
            FsaNature::NoatimeUpdate => "no atime update",
            FsaNature::SynchronousDir => "synchronous directory updates",
            FsaNature::SynchronousUpdate => "synchronous updates",
            FsaNature::TopOfDirHierarchy => "top of directory hierarchy",
        };
        write!(f, "{s}")
    }
}

/// The value carried by an [`FsaEntry`]: either a flag or a count (only
/// `CreationDate` uses the [`BigInt`] form, for an epoch timestamp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsaValue {
    /// A boolean flag.
    Bool(bool),
    /// An unbounded integer (currently only the HFS+ creation date).
    Number(BigInt),
}

impl FsaValue {
    /// The boolean value, if this is a [`FsaValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FsaValue::Bool(b) => Some(*b),
            FsaValue::Number(_) => None,
        }
    }

    /// The numeric value, if this is a [`FsaValue::Number`].
    pub fn as_number(&self) -> Option<&BigInt> {
        match self {
            FsaValue::Bool(_) => None,
            FsaValue::Number(n) => Some(n),
        }
    }
}

/// One `(family, nature, value)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsaEntry {
    family: FsaFamily,
    nature: FsaNature,
    value: FsaValue,
}

impl FsaEntry {
    /// Construct an entry, rejecting a nature that doesn't belong to the
    /// given family (§3: "at most one entry per (family, nature)" implies
    /// a nature is meaningful for exactly one family here).
    pub fn new(family: FsaFamily, nature: FsaNature, value: FsaValue) -> Result<Self> {
        if !nature.valid_for(family) {
            return Err(Error::range(format!("{nature} is not a valid FSA nature for family {family}")));
        }
        Ok(FsaEntry { family, nature, value })
    }

    /// The family this entry belongs to.
    pub fn family(&self) -> FsaFamily {
        self.family
    }

    /// The attribute this entry carries.
    pub fn nature(&self) -> FsaNature {
        self.nature
    }

    /// The entry's value.
    pub fn value(&self) -> &FsaValue {
        &self.value
    }

    fn sort_key(&self) -> (FsaFamily, FsaNature) {
        (self.family, self.nature)
    }
}

/// A set of families controlling which natures a filesystem bridge reads
/// from or writes to (§3, §4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsaScope {
    hfs_plus: bool,
    linux_extx: bool,
}

/// Bit assigned to the HFS+ family in the scope's [`BigInt`] encoding.
const SCOPE_BIT_HFS_PLUS: u64 = 1;
/// Bit assigned to the ext* family in the scope's [`BigInt`] encoding.
const SCOPE_BIT_LINUX_EXTX: u64 = 2;

impl FsaScope {
    /// An empty scope: no family is read from or written to the filesystem.
    pub fn none() -> Self {
        FsaScope::default()
    }

    /// A scope covering every known family.
    pub fn all() -> Self {
        FsaScope { hfs_plus: true, linux_extx: true }
    }

    /// Add a family to the scope.
    pub fn insert(&mut self, family: FsaFamily) {
        match family {
            FsaFamily::HfsPlus => self.hfs_plus = true,
            FsaFamily::LinuxExtX => self.linux_extx = true,
        }
    }

    /// Whether `family` is in scope.
    pub fn contains(&self, family: FsaFamily) -> bool {
        match family {
            FsaFamily::HfsPlus => self.hfs_plus,
            FsaFamily::LinuxExtX => self.linux_extx,
        }
    }

    /// Pack the scope into the bitmask [`BigInt`] form used to persist it
    /// alongside save-order/filter options in an archive header.
    pub fn to_bigint(self) -> BigInt {
        let mut bits: u64 = 0;
        if self.hfs_plus {
            bits |= SCOPE_BIT_HFS_PLUS;
        }
        if self.linux_extx {
            bits |= SCOPE_BIT_LINUX_EXTX;
        }
        BigInt::from(bits)
    }

    /// Unpack a scope from the bitmask form written by [`FsaScope::to_bigint`].
    pub fn from_bigint(value: &BigInt) -> Result<Self> {
        let bits = value.to_u64()?;
        Ok(FsaScope {
            hfs_plus: bits & SCOPE_BIT_HFS_PLUS != 0,
            linux_extx: bits & SCOPE_BIT_LINUX_EXTX != 0,
        })
    }
}

/// An ordered, deduplicated set of [`FsaEntry`] values (§3, §4.K).
///
/// Entries are kept sorted by `(family, nature)`; inserting a second entry
/// for a key already present replaces the first, matching the "at most one
/// entry per (family, nature)" invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsaSet {
    entries: Vec<FsaEntry>,
}

impl FsaSet {
    /// An empty set.
    pub fn new() -> Self {
        FsaSet::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in their on-disk `(family, nature)` order.
    pub fn entries(&self) -> &[FsaEntry] {
        &self.entries
    }

    /// Insert an entry, replacing any existing entry for the same
    /// `(family, nature)` key and keeping the set sorted.
    pub fn insert(&mut self, entry: FsaEntry) {
        match self.entries.binary_search_by_key(&entry.sort_key(), FsaEntry::sort_key) {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    /// Look up the entry for a given `(family, nature)` key.
    pub fn find(&self, family: FsaFamily, nature: FsaNature) -> Option<&FsaEntry> {
        self.entries
            .binary_search_by_key(&(family, nature), FsaEntry::sort_key)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Whether every entry of `self` whose family is in `scope` also
    /// appears, with an equal value, in `other` — mirrors the original's
    /// `is_included_in`, used to decide whether a restored inode's FSA set
    /// already matches the archived one and a rewrite can be skipped.
    pub fn is_included_in(&self, other: &FsaSet, scope: FsaScope) -> bool {
        self.entries
            .iter()
            .filter(|e| scope.contains(e.family))
            .all(|e| other.find(e.family, e.nature) == Some(e))
    }

    /// Serialize as: entry count ([`BigInt`]), then each entry as
    /// `(family-sig, nature-sig, value)` in sorted order.
    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        BigInt::from(self.entries.len() as u64).write_to(w)?;
        for entry in &self.entries {
            w.write_all(&[entry.family.sentinel()])?;
            w.write_all(&entry.nature.sentinel())?;
            match &entry.value {
                FsaValue::Bool(b) => w.write_all(&[if *b { b'T' } else { b'F' }])?,
                FsaValue::Number(n) => n.write_to(w)?,
            }
        }
        Ok(())
    }

    /// Deserialize the form written by [`FsaSet::write_to`].
    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        let count = BigInt::read_from(r)?.to_u64()?;
        let mut set = FsaSet::new();
        for _ in 0..count {
            let mut fam_tag = [0u8; 1];
            r.read_exact(&mut fam_tag)?;
            let family = FsaFamily::from_sentinel(fam_tag[0])?;

            let mut nat_tag = [0u8; 2];
            r.read_exact(&mut nat_tag)?;
            let nature = FsaNature::from_sentinel(nat_tag)?;

            let value = if nature == FsaNature::CreationDate {
                FsaValue::Number(BigInt::read_from(r)?)
            } else {
                let mut flag = [0u8; 1];
                r.read_exact(&mut flag)?;
                match flag[0] {
                    b'T' => FsaValue::Bool(true),
                    b'F' => FsaValue::Bool(false),
                    other => return Err(Error::data(format!("invalid FSA boolean byte {:?}", other as char))),
                }
            };

            set.insert(FsaEntry::new(family, nature, value)?);
        }
        Ok(set)
    }
}

/// Filesystem bridging behind the `linux-fsa` feature: reads and writes the
/// `linux-extX` family through the ext2/3/4 `FS_IOC_GETFLAGS`/
/// `FS_IOC_SETFLAGS` ioctls. The HFS+ family is accepted on the wire by
/// [`FsaSet::read_from`]/[`write_to`] but this bridge never produces or
/// applies it: there's no Linux syscall to read an HFS+ creation date from.
#[cfg(feature = "linux-fsa")]
pub mod linux_bridge {
    use super::*;
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;
    use std::path::Path as StdPath;

    nix::ioctl_read!(ext2_get_flags, b'f', 1, libc::c_long);
    nix::ioctl_write_ptr!(ext2_set_flags, b'f', 2, libc::c_long);

    const EXT2_SECRM_FL: libc::c_long = 0x0000_0001;
    const EXT2_UNRM_FL: libc::c_long = 0x0000_0002;
    const EXT2_COMPR_FL: libc::c_long = 0x0000_0004;
    const EXT2_SYNC_FL: libc::c_long = 0x0000_0008;
    const EXT2_IMMUTABLE_FL: libc::c_long = 0x0000_0010;
    const EXT2_APPEND_FL: libc::c_long = 0x0000_0020;
    const EXT2_NODUMP_FL: libc::c_long = 0x0000_0040;
    const EXT2_NOATIME_FL: libc::c_long = 0x0000_0080;
    const EXT3_JOURNAL_DATA_FL: libc::c_long = 0x0000_4000;
    const EXT2_NOTAIL_FL: libc::c_long = 0x0000_8000;
    const EXT2_DIRSYNC_FL: libc::c_long = 0x0001_0000;
    const EXT2_TOPDIR_FL: libc::c_long = 0x0002_0000;

    /// `(nature, bit)` pairs in the order flags are *read*; unlike writing,
    /// read order carries no ordering invariant.
    const FLAG_BITS: &[(FsaNature, libc::c_long)] = &[
        (FsaNature::AppendOnly, EXT2_APPEND_FL),
        (FsaNature::Compressed, EXT2_COMPR_FL),
        (FsaNature::NoDump, EXT2_NODUMP_FL),
        (FsaNature::Immutable, EXT2_IMMUTABLE_FL),
        (FsaNature::DataJournalling, EXT3_JOURNAL_DATA_FL),
        (FsaNature::SecureDeletion, EXT2_SECRM_FL),
        (FsaNature::NoTailMerging, EXT2_NOTAIL_FL),
        (FsaNature::Undeletable, EXT2_UNRM_FL),
        (FsaNature::NoatimeUpdate, EXT2_NOATIME_FL),
        (FsaNature::SynchronousDir, EXT2_DIRSYNC_FL),
        (FsaNature::SynchronousUpdate, EXT2_SYNC_FL),
        (FsaNature::TopOfDirHierarchy, EXT2_TOPDIR_FL),
    ];

    /// Natures requiring `CAP_LINUX_IMMUTABLE`, applied in a second pass.
    const IMMUTABLE_NATURE: FsaNature = FsaNature::Immutable;
    /// Natures requiring `CAP_SYS_RESOURCE` on some kernels, applied last so
    /// a partial failure never leaves the inode stricter than intended
    /// (§9, "source-dictated" capability order).
    const SYS_RESOURCE_NATURES: &[FsaNature] = &[FsaNature::AppendOnly, FsaNature::Undeletable];

    /// Collect the `linux-extX` entries of `target` into `set`, for every
    /// nature for which `scope` includes [`FsaFamily::LinuxExtX`].
    ///
    /// Any failure to open the file or issue the ioctl (not supported by
    /// the underlying filesystem, e.g. tmpfs) is treated as "this family
    /// isn't available for this file" and silently skipped, per §4.K/§9 —
    /// it is not an error condition for the caller.
    pub fn read_from(set: &mut FsaSet, target: &StdPath, scope: FsaScope) -> Result<()> {
        if !scope.contains(FsaFamily::LinuxExtX) {
            return Ok(());
        }

        let file = match OpenOptions::new().read(true).open(target) {
            Ok(f) => f,
            Err(_) => return Ok(()),
        };

        let mut flags: libc::c_long = 0;
        // SAFETY: `file` stays open for the duration of the call and
        // `flags` is a valid, appropriately-sized output buffer.
        if unsafe { ext2_get_flags(file.as_raw_fd(), &mut flags) }.is_err() {
            return Ok(());
        }

        for (nature, bit) in FLAG_BITS {
            set.insert(FsaEntry::new(
                FsaFamily::LinuxExtX,
                *nature,
                FsaValue::Bool(flags & *bit != 0),
            )?);
        }

        Ok(())
    }

    /// Apply the `linux-extX` entries of `set` to `target`, for natures in
    /// `scope`. Flags are applied in three passes — unprivileged flags
    /// first, then `IMMUTABLE`, then the flags some kernels gate behind
    /// `CAP_SYS_RESOURCE` — so a refusal partway through never leaves the
    /// inode in a stricter state than the archive intended (§9). A
    /// per-pass ioctl refusal is logged as a warning and the remaining
    /// passes still run.
    pub fn write_to(set: &FsaSet, target: &StdPath, scope: FsaScope) -> Result<()> {
        if !scope.contains(FsaFamily::LinuxExtX) {
            return Ok(());
        }

        let entries: Vec<&FsaEntry> =
            set.entries().iter().filter(|e| e.family() == FsaFamily::LinuxExtX).collect();
        if entries.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .open(target)
            .map_err(|e| Error::hardware(format!("opening {target:?} to set FSA flags"), e))?;

        let mut flags: libc::c_long = 0;
        // SAFETY: see `read_from`.
        unsafe { ext2_get_flags(file.as_raw_fd(), &mut flags) }
            .map_err(|e| Error::hardware("reading existing extX flags", std::io::Error::from(e)))?;

        let apply_pass = |flags: &mut libc::c_long, filter: &dyn Fn(FsaNature) -> bool| {
            for entry in &entries {
                if !filter(entry.nature()) {
                    continue;
                }
                let Some((_, bit)) = FLAG_BITS.iter().find(|(n, _)| *n == entry.nature()) else {
                    continue;
                };
                let Some(value) = entry.value().as_bool() else {
                    continue;
                };
                if value {
                    *flags |= *bit;
                } else {
                    *flags &= !*bit;
                }
            }
        };

        apply_pass(&mut flags, &|n| n != IMMUTABLE_NATURE && !SYS_RESOURCE_NATURES.contains(&n));
        // SAFETY: `flags` is a valid pointer to the ioctl's expected input type.
        if let Err(e) = unsafe { ext2_set_flags(file.as_raw_fd(), &flags) } {
            log::warn!("setting unprivileged extX FSA flags on {target:?} failed: {e}");
        }

        apply_pass(&mut flags, &|n| n == IMMUTABLE_NATURE);
        // SAFETY: see above.
        if let Err(e) = unsafe { ext2_set_flags(file.as_raw_fd(), &flags) } {
            log::warn!("setting IMMUTABLE FSA flag on {target:?} failed: {e}");
        }

        apply_pass(&mut flags, &|n| SYS_RESOURCE_NATURES.contains(&n));
        // SAFETY: see above.
        if let Err(e) = unsafe { ext2_set_flags(file.as_raw_fd(), &flags) } {
            log::warn!("setting CAP_SYS_RESOURCE FSA flags on {target:?} failed: {e}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_round_trip() {
        for family in [FsaFamily::HfsPlus, FsaFamily::LinuxExtX] {
            assert_eq!(FsaFamily::from_sentinel(family.sentinel()).unwrap(), family);
        }
        let natures = [
            FsaNature::AppendOnly,
            FsaNature::Compressed,
            FsaNature::NoDump,
            FsaNature::Immutable,
            FsaNature::DataJournalling,
            FsaNature::SecureDeletion,
            FsaNature::NoTailMerging,
            FsaNature::Undeletable,
            FsaNature::NoatimeUpdate,
            FsaNature::SynchronousDir,
            FsaNature::SynchronousUpdate,
            FsaNature::TopOfDirHierarchy,
            FsaNature::CreationDate,
        ];
        for nature in natures {
            assert_eq!(FsaNature::from_sentinel(nature.sentinel()).unwrap(), nature);
        }
    }

    #[test]
    fn reserved_sentinels_are_unknown_feature() {
        assert!(matches!(FsaFamily::from_sentinel(b'X'), Err(Error::FeatureUnavailable { .. })));
        assert!(matches!(FsaNature::from_sentinel(*b"XX"), Err(Error::FeatureUnavailable { .. })));
    }

    #[test]
    fn family_mismatch_is_rejected() {
        assert!(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::CreationDate, FsaValue::Bool(true)).is_err());
        assert!(FsaEntry::new(FsaFamily::HfsPlus, FsaNature::Immutable, FsaValue::Bool(true)).is_err());
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut set = FsaSet::new();
        set.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::Immutable, FsaValue::Bool(false)).unwrap());
        set.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::Immutable, FsaValue::Bool(true)).unwrap());
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.find(FsaFamily::LinuxExtX, FsaNature::Immutable).unwrap().value().as_bool(),
            Some(true)
        );
    }

    #[test]
    fn entries_stay_sorted_by_family_then_nature() {
        let mut set = FsaSet::new();
        set.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::TopOfDirHierarchy, FsaValue::Bool(true)).unwrap());
        set.insert(FsaEntry::new(FsaFamily::HfsPlus, FsaNature::CreationDate, FsaValue::Number(BigInt::from(42u64))).unwrap());
        set.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::AppendOnly, FsaValue::Bool(true)).unwrap());

        let keys: Vec<_> = set.entries().iter().map(|e| (e.family(), e.nature())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn wire_round_trip() {
        let mut set = FsaSet::new();
        set.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::Immutable, FsaValue::Bool(true)).unwrap());
        set.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::NoDump, FsaValue::Bool(false)).unwrap());
        set.insert(FsaEntry::new(FsaFamily::HfsPlus, FsaNature::CreationDate, FsaValue::Number(BigInt::from(1_700_000_000u64))).unwrap());

        let mut buf = Vec::new();
        set.write_to(&mut buf).unwrap();
        let decoded = FsaSet::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn empty_set_round_trips() {
        let set = FsaSet::new();
        let mut buf = Vec::new();
        set.write_to(&mut buf).unwrap();
        let decoded = FsaSet::read_from(&mut &buf[..]).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn scope_bigint_round_trip() {
        let mut scope = FsaScope::none();
        scope.insert(FsaFamily::LinuxExtX);
        let decoded = FsaScope::from_bigint(&scope.to_bigint()).unwrap();
        assert_eq!(decoded, scope);
        assert!(decoded.contains(FsaFamily::LinuxExtX));
        assert!(!decoded.contains(FsaFamily::HfsPlus));

        let full = FsaScope::all();
        assert_eq!(FsaScope::from_bigint(&full.to_bigint()).unwrap(), full);
    }

    #[test]
    fn is_included_in_respects_scope() {
        let mut archived = FsaSet::new();
        archived.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::Immutable, FsaValue::Bool(true)).unwrap());
        archived.insert(FsaEntry::new(FsaFamily::HfsPlus, FsaNature::CreationDate, FsaValue::Number(BigInt::from(7u64))).unwrap());

        let mut restored = FsaSet::new();
        restored.insert(FsaEntry::new(FsaFamily::LinuxExtX, FsaNature::Immutable, FsaValue::Bool(true)).unwrap());
        // HFS+ creation date deliberately absent from `restored`.

        assert!(!archived.is_included_in(&restored, FsaScope::all()));

        let mut extx_only = FsaScope::none();
        extx_only.insert(FsaFamily::LinuxExtX);
        assert!(archived.is_included_in(&restored, extx_only));
    }
}

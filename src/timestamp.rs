//! Unix-epoch timestamp used to restore a file's access/modification times.
//!
//! The archive's own catalog/inode metadata is out of scope for this crate
//! (§1 Non-goals); this type exists only for the one in-scope layer that
//! carries dates directly —
//! [`crate::local_file::LocalFileStream::set_times`]'s `futimens`-style
//! restoration of a restored file's timestamps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds (and sub-second nanoseconds) since the Unix epoch. May precede
/// the epoch, recorded as a negative second count with a non-negative
/// nanosecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    /// The Unix epoch itself.
    pub const EPOCH: Timestamp = Timestamp { secs: 0, nanos: 0 };

    /// Construct from seconds and a sub-second nanosecond remainder
    /// (`0..1_000_000_000`).
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Timestamp { secs, nanos }
    }

    /// Seconds since the Unix epoch (negative if before it).
    pub const fn unix_secs(&self) -> i64 {
        self.secs
    }

    /// Sub-second nanosecond remainder.
    pub const fn sub_second_nanos(&self) -> u32 {
        self.nanos
    }

    /// Construct from a [`SystemTime`].
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp { secs: d.as_secs() as i64, nanos: d.subsec_nanos() },
            Err(e) => {
                let d = e.duration();
                if d.subsec_nanos() == 0 {
                    Timestamp { secs: -(d.as_secs() as i64), nanos: 0 }
                } else {
                    Timestamp { secs: -(d.as_secs() as i64) - 1, nanos: 1_000_000_000 - d.subsec_nanos() }
                }
            }
        }
    }

    /// Convert to a [`SystemTime`].
    pub fn as_system_time(&self) -> SystemTime {
        if self.secs >= 0 {
            UNIX_EPOCH + Duration::new(self.secs as u64, self.nanos)
        } else {
            UNIX_EPOCH - Duration::new((-self.secs) as u64, 0) + Duration::new(0, self.nanos)
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Timestamp::from_system_time(time)
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> SystemTime {
        ts.as_system_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_roundtrip() {
        let ts = Timestamp::EPOCH;
        assert_eq!(ts.as_system_time(), UNIX_EPOCH);
        assert_eq!(ts.unix_secs(), 0);
    }

    #[test]
    fn system_time_roundtrip() {
        let original = UNIX_EPOCH + Duration::new(1_700_000_000, 123_000_000);
        let ts = Timestamp::from_system_time(original);
        assert_eq!(ts.as_system_time(), original);
    }

    #[test]
    fn pre_epoch_round_trips_through_system_time() {
        let original = UNIX_EPOCH - Duration::new(10, 0);
        let ts = Timestamp::from_system_time(original);
        assert!(ts.unix_secs() < 0);
        assert_eq!(ts.as_system_time(), original);
    }
}

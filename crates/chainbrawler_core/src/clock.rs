//! # Wall Clock
//!
//! Timestamps for snapshots and the epoch-length fallback come from a
//! [`Clock`] so they can be pinned in tests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> SystemTime;
}

/// The operating system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that always reads the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub SystemTime);

impl FixedClock {
    /// Clock pinned `secs` seconds after the Unix epoch.
    #[must_use]
    pub fn at_unix(secs: u64) -> Self {
        Self(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

impl Clock for FixedClock {
    #[inline]
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Estimated seconds left in the current epoch when the ledger cannot say.
///
/// Assumes epochs of `epoch_secs` aligned to midnight in a zone
/// `utc_offset_secs` east of UTC. An approximation only; it knows nothing of
/// the ledger's real epoch start.
#[must_use]
pub fn fallback_epoch_time_remaining(now: SystemTime, utc_offset_secs: i64, epoch_secs: u64) -> u64 {
    if epoch_secs == 0 {
        return 0;
    }

    let unix = now
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    let local = i128::from(unix) + i128::from(utc_offset_secs);
    let into_epoch = local.rem_euclid(i128::from(epoch_secs));

    // `into_epoch < epoch_secs`, so this fits.
    u64::try_from(i128::from(epoch_secs) - into_epoch).unwrap_or(0)
}

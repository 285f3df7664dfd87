//! Hit/miss accounting for the artifact caches.

use std::fmt;
use std::ops::Sub;

/// Lookup and write counters of one store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries written, including overwrites.
    pub writes: u64,
}

impl CacheStats {
    /// Total number of lookups.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

impl Sub for CacheStats {
    type Output = CacheStats;

    fn sub(self, earlier: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits.saturating_sub(earlier.hits),
            misses: self.misses.saturating_sub(earlier.misses),
            writes: self.writes.saturating_sub(earlier.writes),
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits, {} misses, {} writes",
            self.hits, self.misses, self.writes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_between_snapshots() {
        let before = CacheStats {
            hits: 2,
            misses: 5,
            writes: 5,
        };
        let after = CacheStats {
            hits: 9,
            misses: 5,
            writes: 6,
        };
        let delta = after - before;
        assert_eq!(delta.hits, 7);
        assert_eq!(delta.misses, 0);
        assert_eq!(delta.writes, 1);
        assert_eq!(delta.lookups(), 7);
    }

    #[test]
    fn display_format() {
        let s = CacheStats {
            hits: 1,
            misses: 2,
            writes: 3,
        };
        assert_eq!(s.to_string(), "1 hits, 2 misses, 3 writes");
    }
}

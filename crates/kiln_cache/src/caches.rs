//! The pair of caches wired into every backend invocation.

use crate::artifact::CachedArtifact;
use crate::stats::CacheStats;
use crate::store::MemoryStore;

/// Cache of pre-lowering syntax trees, keyed by method identity.
pub type AstCache = MemoryStore<CachedArtifact>;

/// Cache of lowered programs, keyed by method identity.
pub type ProgramCache = MemoryStore<CachedArtifact>;

/// Both backend caches, owned by the worker for its whole lifetime.
///
/// The intermediate-tree cache lets a backend skip decompilation when only
/// late lowering changed; the program cache lets it skip re-lowering an
/// unchanged method entirely.
#[derive(Debug, Default)]
pub struct ArtifactCaches {
    /// Intermediate-tree cache.
    pub ast: AstCache,
    /// Lowered-program cache.
    pub programs: ProgramCache,
}

/// Counters of both stores at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CachesSnapshot {
    /// Intermediate-tree cache counters.
    pub ast: CacheStats,
    /// Lowered-program cache counters.
    pub programs: CacheStats,
}

impl ArtifactCaches {
    /// Creates two empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if neither cache holds an entry.
    pub fn is_empty(&self) -> bool {
        self.ast.is_empty() && self.programs.is_empty()
    }

    /// Total number of entries across both caches.
    pub fn entry_count(&self) -> usize {
        self.ast.len() + self.programs.len()
    }

    /// Snapshot of both stores' counters.
    pub fn snapshot(&self) -> CachesSnapshot {
        CachesSnapshot {
            ast: self.ast.stats(),
            programs: self.programs.stats(),
        }
    }

    /// Logs the counter change since `before` at debug level.
    pub fn log_since(&self, before: CachesSnapshot) {
        let now = self.snapshot();
        log::debug!("ast cache: {}", now.ast - before.ast);
        log::debug!("program cache: {}", now.programs - before.programs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::{ContentHash, MethodRef};

    #[test]
    fn stores_are_independent() {
        let mut caches = ArtifactCaches::new();
        let key = MethodRef::entry_point("Hello", "main");
        let value = CachedArtifact::new(ContentHash::from_bytes(b"body"), b"js".to_vec());
        caches.programs.put(key.clone(), value);
        assert!(caches.ast.get(&key).is_none());
        assert!(caches.programs.get(&key).is_some());
        assert_eq!(caches.entry_count(), 1);
        assert!(!caches.is_empty());
    }

    #[test]
    fn snapshot_tracks_both_stores() {
        let mut caches = ArtifactCaches::new();
        let key = MethodRef::entry_point("Hello", "main");
        let before = caches.snapshot();
        caches.ast.get(&key);
        caches
            .ast
            .put(key.clone(), CachedArtifact::new(ContentHash::from_bytes(b"b"), b"t".to_vec()));
        caches.ast.get(&key);
        let after = caches.snapshot();
        assert_eq!((after.ast - before.ast).hits, 1);
        assert_eq!((after.ast - before.ast).misses, 1);
        assert_eq!(after.programs, CacheStats::default());
    }
}

//! Cached values with the fingerprint of the input they were derived from.

use std::sync::Arc;

use kiln_common::ContentHash;

/// An opaque cached representation plus the fingerprint of its input.
///
/// The bytes are whatever the backend chose to store (a serialized syntax
/// tree, a lowered program). `source` is the hash of the method body the value
/// was produced from: a backend compares it against the current body before
/// reusing the value, and overwrites the entry when they differ.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedArtifact {
    /// Fingerprint of the input the value was derived from.
    pub source: ContentHash,
    /// The cached representation.
    pub bytes: Arc<[u8]>,
}

impl CachedArtifact {
    /// Creates a cached value for the given input fingerprint.
    pub fn new(source: ContentHash, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source,
            bytes: bytes.into(),
        }
    }

    /// Returns `true` if this value was derived from an input with `hash`.
    pub fn matches(&self, hash: &ContentHash) -> bool {
        self.source == *hash
    }

    /// Size of the cached representation in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the cached representation is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

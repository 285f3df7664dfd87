//! Content fingerprints for cached backend artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An XXH3-128 fingerprint of the input a cached artifact was derived from.
///
/// Cached intermediate trees and lowered programs carry the fingerprint of
/// the method they came from; a backend reuses a cached value only when the
/// current method's fingerprint equals the stored one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Fingerprints one byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Fingerprints a sequence of parts, each length-prefixed, so that
    /// `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn from_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut buf = Vec::new();
        for part in parts {
            buf.extend_from_slice(&(part.len() as u64).to_le_bytes());
            buf.extend_from_slice(part);
        }
        Self::from_bytes(&buf)
    }

    /// Fingerprints a method declaration together with its body bytes.
    pub fn of_method(class: &str, name: &str, descriptor: &str, body: &[u8]) -> Self {
        Self::from_parts([class.as_bytes(), name.as_bytes(), descriptor.as_bytes(), body])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}{:02x}{:02x})", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_body_same_fingerprint() {
        let a = ContentHash::of_method("Hello", "main", "([Ljava/lang/String;)V", b"return");
        let b = ContentHash::of_method("Hello", "main", "([Ljava/lang/String;)V", b"return");
        assert_eq!(a, b);
    }

    #[test]
    fn edited_body_changes_fingerprint() {
        let a = ContentHash::of_method("Hello", "main", "([Ljava/lang/String;)V", b"return");
        let b = ContentHash::of_method("Hello", "main", "([Ljava/lang/String;)V", b"nop; return");
        assert_ne!(a, b);
    }

    #[test]
    fn part_boundaries_matter() {
        let a = ContentHash::from_parts([b"Hello".as_slice(), b"main".as_slice()]);
        let b = ContentHash::from_parts([b"Hellom".as_slice(), b"ain".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_32_hex_digits() {
        let s = ContentHash::from_bytes(b"classes.js").to_string();
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_shows_prefix_of_display() {
        let h = ContentHash::from_bytes(b"classes.js");
        let debug = format!("{h:?}");
        assert_eq!(debug, format!("ContentHash({})", &h.to_string()[..8]));
    }

    #[test]
    fn json_round_trip() {
        let h = ContentHash::from_bytes(b"tree");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(serde_json::from_str::<ContentHash>(&json).unwrap(), h);
    }
}

//! Method identity shared by the backend entry point and the artifact caches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one method by owning class, name and descriptor.
///
/// Class names use the binary internal form (`java/lang/String`) and the
/// descriptor is a JVM method descriptor (`([Ljava/lang/String;)V`). The key
/// is derived from declarations only, so it stays stable across compiles of
/// unchanged code and lets the artifact caches serve earlier results.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct MethodRef {
    /// Owning class in internal form.
    pub class: String,
    /// Method name.
    pub name: String,
    /// JVM method descriptor.
    pub descriptor: String,
}

impl MethodRef {
    /// Descriptor of the fixed entry-point signature: one argument array, no return value.
    pub const MAIN_DESCRIPTOR: &'static str = "([Ljava/lang/String;)V";

    /// Creates a new method reference.
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Creates the `name(String[])void` entry-point reference for a class.
    pub fn entry_point(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(class, name, Self::MAIN_DESCRIPTOR)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.class.replace('/', "."),
            self.name,
            self.descriptor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_point_descriptor() {
        let m = MethodRef::entry_point("Hello", "main");
        assert_eq!(m.descriptor, "([Ljava/lang/String;)V");
    }

    #[test]
    fn display_uses_dotted_class() {
        let m = MethodRef::new("java/lang/Object", "hashCode", "()I");
        assert_eq!(m.to_string(), "java.lang.Object.hashCode()I");
    }

    #[test]
    fn equal_refs_hash_equal() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(MethodRef::entry_point("Hello", "main"));
        assert!(set.contains(&MethodRef::entry_point("Hello", "main")));
        assert!(!set.contains(&MethodRef::entry_point("Other", "main")));
    }
}

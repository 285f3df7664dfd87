//! Error types for class-file reading and writing.

use thiserror::Error;

/// Errors raised when bytes are not a well-formed class file, or when a
/// rewritten class cannot be encoded again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFormatError {
    /// The file does not start with `0xCAFEBABE`.
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    /// The input ended in the middle of a structure.
    #[error("unexpected end of class file at offset {offset}")]
    Truncated {
        /// Byte offset at which more input was expected.
        offset: usize,
    },

    /// A constant pool entry carries a tag this reader does not know.
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag {
        /// Constant pool index of the entry.
        index: u16,
        /// The offending tag byte.
        tag: u8,
    },

    /// A constant pool reference is out of range or points at the wrong kind of entry.
    #[error("constant pool index {index} is not a valid {expected} entry")]
    BadIndex {
        /// The referenced index.
        index: u16,
        /// The kind of entry that was expected there.
        expected: &'static str,
    },

    /// A `CONSTANT_Utf8` entry is not valid modified UTF-8.
    #[error("invalid modified UTF-8 in constant pool entry {index}")]
    InvalidUtf8 {
        /// Constant pool index of the entry.
        index: u16,
    },

    /// A retained attribute's declared length disagrees with its content.
    #[error("attribute {name} declares {declared} bytes but {actual} were read")]
    AttributeLength {
        /// Attribute name.
        name: String,
        /// Length from the attribute header.
        declared: u32,
        /// Bytes actually consumed while parsing the body.
        actual: usize,
    },

    /// An annotation element value has an unknown tag.
    #[error("unknown annotation element tag '{0}'")]
    BadElementTag(char),

    /// A descriptor or generic signature does not follow the grammar.
    #[error("malformed type signature '{0}'")]
    BadSignature(String),

    /// An annotation value or type signature nests deeper than [`crate::MAX_NESTING`].
    #[error("{what} nested deeper than {limit} levels")]
    TooDeep {
        /// The structure that nested too deeply.
        what: &'static str,
        /// The nesting limit.
        limit: usize,
    },

    /// Bytes remain after the last attribute of the class.
    #[error("{0} trailing bytes after end of class file")]
    TrailingBytes(usize),

    /// A table or the constant pool outgrew the 16-bit limits of the format.
    #[error("{what} exceeds the class-file limit of 65535 entries")]
    TooLarge {
        /// The structure that overflowed.
        what: &'static str,
    },
}

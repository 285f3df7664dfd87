//! The constant pool: the parsed table used while reading and the
//! deduplicating builder used while writing.

use crate::error::ClassFormatError;
use crate::mutf8;
use std::collections::HashMap;

/// Constant pool tags defined up to class-file version 61.
pub mod tag {
    #![allow(missing_docs)]
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

/// One entry of a parsed constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Decoded `CONSTANT_Utf8`.
    Utf8(String),
    /// `CONSTANT_Integer`.
    Integer(i32),
    /// `CONSTANT_Float`, kept as raw bits.
    Float(u32),
    /// `CONSTANT_Long`.
    Long(i64),
    /// `CONSTANT_Double`, kept as raw bits.
    Double(u64),
    /// `CONSTANT_Class` with its name index.
    Class(u16),
    /// `CONSTANT_String` with its UTF-8 index.
    String(u16),
    /// Field, method or interface-method reference: tag, class, name-and-type.
    MemberRef(u8, u16, u16),
    /// `CONSTANT_NameAndType`: name, descriptor.
    NameAndType(u16, u16),
    /// `CONSTANT_MethodHandle`: reference kind, reference index.
    MethodHandle(u8, u16),
    /// `CONSTANT_MethodType` with its descriptor index.
    MethodType(u16),
    /// `CONSTANT_Dynamic` or `CONSTANT_InvokeDynamic`: tag, bootstrap index, name-and-type.
    Dynamic(u8, u16, u16),
    /// `CONSTANT_Module` or `CONSTANT_Package`: tag, name index.
    Named(u8, u16),
    /// The unused slot following a long or double, and slot zero.
    Unusable,
}

/// A parsed constant pool. Index 0 is never valid.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Creates a pool from entries where `entries[0]` is the unusable slot zero.
    pub fn from_entries(entries: Vec<Constant>) -> Self {
        Self { entries }
    }

    /// The value of `constant_pool_count` for this pool.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the entry at `index`, rejecting slot zero and the long/double shadow slots.
    pub fn get(&self, index: u16, expected: &'static str) -> Result<&Constant, ClassFormatError> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFormatError::BadIndex { index, expected }),
            Some(c) => Ok(c),
        }
    }

    /// Resolves a `CONSTANT_Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&str, ClassFormatError> {
        match self.get(index, "Utf8")? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(ClassFormatError::BadIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Resolves a `CONSTANT_Class` entry to its internal name.
    pub fn class_name(&self, index: u16) -> Result<&str, ClassFormatError> {
        match self.get(index, "Class")? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(ClassFormatError::BadIndex {
                index,
                expected: "Class",
            }),
        }
    }

    /// Resolves a `CONSTANT_NameAndType` entry to `(name, descriptor)`.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassFormatError> {
        match self.get(index, "NameAndType")? {
            Constant::NameAndType(name, descriptor) => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(ClassFormatError::BadIndex {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Checks that every cross-reference inside the pool points at an entry of the right kind.
    pub fn validate(&self) -> Result<(), ClassFormatError> {
        for constant in &self.entries {
            match *constant {
                Constant::Class(name) | Constant::Named(_, name) => {
                    self.utf8(name)?;
                }
                Constant::String(value) => {
                    self.utf8(value)?;
                }
                Constant::MethodType(descriptor) => {
                    self.utf8(descriptor)?;
                }
                Constant::MemberRef(_, class, nat) => {
                    self.class_name(class)?;
                    self.name_and_type(nat)?;
                }
                Constant::NameAndType(name, descriptor) => {
                    self.utf8(name)?;
                    self.utf8(descriptor)?;
                }
                Constant::Dynamic(_, _, nat) => {
                    self.name_and_type(nat)?;
                }
                Constant::MethodHandle(kind, reference) => {
                    if !(1..=9).contains(&kind) {
                        return Err(ClassFormatError::BadIndex {
                            index: reference,
                            expected: "method handle reference",
                        });
                    }
                    if !matches!(
                        self.get(reference, "member reference")?,
                        Constant::MemberRef(..)
                    ) {
                        return Err(ClassFormatError::BadIndex {
                            index: reference,
                            expected: "member reference",
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Key of a constant the writer can emit. Only the kinds that survive
/// stripping of method bodies are needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    NameAndType(u16, u16),
}

/// Builds a fresh constant pool in first-use order, deduplicating entries.
///
/// Output depends only on the sequence of `add_*` calls, so writing the
/// same class twice yields identical bytes.
#[derive(Debug)]
pub struct PoolBuilder {
    bytes: Vec<u8>,
    index: HashMap<PoolKey, u16>,
    next: u32,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolBuilder {
    /// Creates an empty pool. The first entry gets index 1.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            index: HashMap::new(),
            next: 1,
        }
    }

    /// The value of `constant_pool_count` for the entries added so far.
    pub fn count(&self) -> u16 {
        self.next as u16
    }

    /// The encoded entries, without the leading count.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn intern(&mut self, key: PoolKey, slots: u32) -> Result<u16, ClassFormatError> {
        if let Some(&index) = self.index.get(&key) {
            return Ok(index);
        }
        if self.next + slots > u16::MAX as u32 {
            return Err(ClassFormatError::TooLarge {
                what: "constant pool",
            });
        }
        let index = self.next as u16;
        match &key {
            PoolKey::Utf8(s) => {
                let encoded = mutf8::encode(s);
                let len = u16::try_from(encoded.len()).map_err(|_| ClassFormatError::TooLarge {
                    what: "UTF-8 constant",
                })?;
                self.bytes.push(tag::UTF8);
                self.bytes.extend_from_slice(&len.to_be_bytes());
                self.bytes.extend_from_slice(&encoded);
            }
            PoolKey::Integer(v) => {
                self.bytes.push(tag::INTEGER);
                self.bytes.extend_from_slice(&v.to_be_bytes());
            }
            PoolKey::Float(bits) => {
                self.bytes.push(tag::FLOAT);
                self.bytes.extend_from_slice(&bits.to_be_bytes());
            }
            PoolKey::Long(v) => {
                self.bytes.push(tag::LONG);
                self.bytes.extend_from_slice(&v.to_be_bytes());
            }
            PoolKey::Double(bits) => {
                self.bytes.push(tag::DOUBLE);
                self.bytes.extend_from_slice(&bits.to_be_bytes());
            }
            PoolKey::Class(name) => {
                self.bytes.push(tag::CLASS);
                self.bytes.extend_from_slice(&name.to_be_bytes());
            }
            PoolKey::String(value) => {
                self.bytes.push(tag::STRING);
                self.bytes.extend_from_slice(&value.to_be_bytes());
            }
            PoolKey::NameAndType(name, descriptor) => {
                self.bytes.push(tag::NAME_AND_TYPE);
                self.bytes.extend_from_slice(&name.to_be_bytes());
                self.bytes.extend_from_slice(&descriptor.to_be_bytes());
            }
        }
        self.index.insert(key, index);
        self.next += slots;
        Ok(index)
    }

    /// Adds a `CONSTANT_Utf8`.
    pub fn utf8(&mut self, s: &str) -> Result<u16, ClassFormatError> {
        self.intern(PoolKey::Utf8(s.to_string()), 1)
    }

    /// Adds a `CONSTANT_Class` for an internal name.
    pub fn class(&mut self, name: &str) -> Result<u16, ClassFormatError> {
        let name = self.utf8(name)?;
        self.intern(PoolKey::Class(name), 1)
    }

    /// Adds a `CONSTANT_String`.
    pub fn string(&mut self, value: &str) -> Result<u16, ClassFormatError> {
        let value = self.utf8(value)?;
        self.intern(PoolKey::String(value), 1)
    }

    /// Adds a `CONSTANT_NameAndType`.
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, ClassFormatError> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.intern(PoolKey::NameAndType(name, descriptor), 1)
    }

    /// Adds a `CONSTANT_Integer`.
    pub fn integer(&mut self, value: i32) -> Result<u16, ClassFormatError> {
        self.intern(PoolKey::Integer(value), 1)
    }

    /// Adds a `CONSTANT_Float` from raw bits.
    pub fn float(&mut self, bits: u32) -> Result<u16, ClassFormatError> {
        self.intern(PoolKey::Float(bits), 1)
    }

    /// Adds a `CONSTANT_Long`, which occupies two slots.
    pub fn long(&mut self, value: i64) -> Result<u16, ClassFormatError> {
        self.intern(PoolKey::Long(value), 2)
    }

    /// Adds a `CONSTANT_Double` from raw bits, which occupies two slots.
    pub fn double(&mut self, bits: u64) -> Result<u16, ClassFormatError> {
        self.intern(PoolKey::Double(bits), 2)
    }
}

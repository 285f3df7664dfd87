//! Structural reading, rewriting and writing of JVM class files.
//!
//! Only the class-level structure is modelled: names, the field and method
//! tables, and the handful of attributes a compiler needs to resolve and
//! link against a class. Method bodies and debug tables are dropped on read.
//! [`transform_class`] combines reading, [`RenameRule`] remapping, marker
//! based visibility and writing into the single pure step used to prepare a
//! library image.

#![warn(missing_docs)]

pub mod constant;
pub mod error;
pub mod model;
pub mod mutf8;
pub mod reader;
pub mod rename;
pub mod transform;
pub mod writer;

pub use error::ClassFormatError;
pub use model::{
    access, Annotation, Attribute, ClassFile, ConstValue, ElementValue, InnerClass, Member,
};
pub use reader::parse_class;
pub use rename::{PackageMapping, RenameRule};
pub use transform::{transform_class, TransformedClass};
pub use writer::write_class;

/// The four bytes every class file starts with.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Deepest nesting accepted in annotation values and type signatures,
/// matching the JVM's limit on array dimensions.
pub const MAX_NESTING: usize = 255;

//! The structural model of a class file, with names resolved out of the
//! constant pool.

/// Access flag bits shared by classes, fields and methods.
pub mod access {
    #![allow(missing_docs)]
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
}

/// A class file reduced to its linkable structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Minor format version.
    pub minor_version: u16,
    /// Major format version.
    pub major_version: u16,
    /// Class access flags.
    pub access_flags: u16,
    /// Internal name of this class, e.g. `java/lang/Object`.
    pub this_class: String,
    /// Internal name of the superclass; `None` only for `java/lang/Object`.
    pub super_class: Option<String>,
    /// Internal names of the direct superinterfaces.
    pub interfaces: Vec<String>,
    /// Declared fields.
    pub fields: Vec<Member>,
    /// Declared methods.
    pub methods: Vec<Member>,
    /// Retained class attributes.
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Creates a public class with no members, targeting Java 8 (major 52).
    pub fn new(this_class: &str, super_class: Option<&str>) -> Self {
        Self {
            minor_version: 0,
            major_version: 52,
            access_flags: access::PUBLIC | access::SUPER,
            this_class: this_class.to_string(),
            super_class: super_class.map(str::to_string),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// The class name in dotted binary form, e.g. `java.util.Map$Entry`.
    pub fn binary_name(&self) -> String {
        self.this_class.replace('/', ".")
    }

    /// Every annotation on the class, from both visible and invisible tables.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.attributes.iter().flat_map(|attr| match attr {
            Attribute::RuntimeVisibleAnnotations(list)
            | Attribute::RuntimeInvisibleAnnotations(list) => list.as_slice(),
            _ => &[],
        })
    }

    /// Returns `true` if the class carries an annotation of type `descriptor`.
    pub fn has_annotation(&self, descriptor: &str) -> bool {
        self.annotations().any(|a| a.type_descriptor == descriptor)
    }

    /// Removes every class annotation of type `descriptor`, dropping
    /// annotation tables that become empty. Returns how many were removed.
    pub fn remove_annotation(&mut self, descriptor: &str) -> usize {
        let mut removed = 0;
        for attr in &mut self.attributes {
            if let Attribute::RuntimeVisibleAnnotations(list)
            | Attribute::RuntimeInvisibleAnnotations(list) = attr
            {
                let before = list.len();
                list.retain(|a| a.type_descriptor != descriptor);
                removed += before - list.len();
            }
        }
        self.attributes.retain(|attr| {
            !matches!(attr,
                Attribute::RuntimeVisibleAnnotations(list)
                | Attribute::RuntimeInvisibleAnnotations(list) if list.is_empty())
        });
        removed
    }
}

/// A field or method.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Access flags.
    pub access_flags: u16,
    /// Simple name.
    pub name: String,
    /// Field or method descriptor.
    pub descriptor: String,
    /// Retained member attributes.
    pub attributes: Vec<Attribute>,
}

impl Member {
    /// Creates a member with no attributes.
    pub fn new(access_flags: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: Vec::new(),
        }
    }
}

/// The attributes kept when a class is read. All others are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Generic signature of a class, field or method.
    Signature(String),
    /// Checked exceptions a method declares, as internal names.
    Exceptions(Vec<String>),
    /// The inner-class table.
    InnerClasses(Vec<InnerClass>),
    /// Enclosing class and, for local classes in a method, its name and descriptor.
    EnclosingMethod {
        /// Internal name of the enclosing class.
        class: String,
        /// Name and descriptor of the enclosing method, if any.
        method: Option<(String, String)>,
    },
    /// Initial value of a static final field.
    ConstantValue(ConstValue),
    /// `Deprecated` marker.
    Deprecated,
    /// `Synthetic` marker.
    Synthetic,
    /// Annotations retained at run time.
    RuntimeVisibleAnnotations(Vec<Annotation>),
    /// Annotations retained only in the class file.
    RuntimeInvisibleAnnotations(Vec<Annotation>),
}

impl Attribute {
    /// The attribute name as written in the class file.
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Signature(_) => "Signature",
            Attribute::Exceptions(_) => "Exceptions",
            Attribute::InnerClasses(_) => "InnerClasses",
            Attribute::EnclosingMethod { .. } => "EnclosingMethod",
            Attribute::ConstantValue(_) => "ConstantValue",
            Attribute::Deprecated => "Deprecated",
            Attribute::Synthetic => "Synthetic",
            Attribute::RuntimeVisibleAnnotations(_) => "RuntimeVisibleAnnotations",
            Attribute::RuntimeInvisibleAnnotations(_) => "RuntimeInvisibleAnnotations",
        }
    }
}

/// One row of the `InnerClasses` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    /// Internal name of the inner class.
    pub inner: String,
    /// Internal name of the declaring class, if a member class.
    pub outer: Option<String>,
    /// Simple source name, if not anonymous.
    pub name: Option<String>,
    /// Access flags as declared in source.
    pub access_flags: u16,
}

/// A loadable constant used as a field's initial value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// `int`, `short`, `char`, `byte` and `boolean` values.
    Int(i32),
    /// `float`, as raw bits.
    Float(u32),
    /// `long`.
    Long(i64),
    /// `double`, as raw bits.
    Double(u64),
    /// `String`.
    String(String),
}

/// An annotation and its element-value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation interface, e.g. `Ljava/lang/Deprecated;`.
    pub type_descriptor: String,
    /// Element name and value pairs in declaration order.
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    /// Creates a marker annotation with no elements.
    pub fn marker(type_descriptor: &str) -> Self {
        Self {
            type_descriptor: type_descriptor.to_string(),
            elements: Vec::new(),
        }
    }
}

/// The value of one annotation element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// A primitive constant; `tag` is one of `B C I S Z`.
    Int {
        /// The element tag.
        tag: u8,
        /// The value.
        value: i32,
    },
    /// A `long` constant.
    Long(i64),
    /// A `float` constant, as raw bits.
    Float(u32),
    /// A `double` constant, as raw bits.
    Double(u64),
    /// A `String` constant.
    String(String),
    /// An enum constant: descriptor of the enum type and constant name.
    Enum {
        /// Field descriptor of the enum type.
        type_descriptor: String,
        /// Name of the constant.
        const_name: String,
    },
    /// A class literal, as a return descriptor (`V` for `void.class`).
    Class(String),
    /// A nested annotation.
    Annotation(Annotation),
    /// An array of values.
    Array(Vec<ElementValue>),
}

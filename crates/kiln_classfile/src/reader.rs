//! Parsing class-file bytes into the structural model.
//!
//! Attributes outside the retained set (see [`Attribute`]) are skipped by
//! length without being interpreted, which is how method bodies and debug
//! tables are dropped.

use crate::constant::{tag, Constant, ConstantPool};
use crate::error::ClassFormatError;
use crate::model::{Annotation, Attribute, ClassFile, ConstValue, ElementValue, InnerClass, Member};
use crate::{mutf8, MAGIC, MAX_NESTING};

/// Big-endian cursor over a byte slice.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ClassFormatError> {
        if self.remaining() < n {
            return Err(ClassFormatError::Truncated {
                offset: self.base + self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Splits off a reader over the next `n` bytes.
    pub fn sub(&mut self, n: usize) -> Result<ByteReader<'a>, ClassFormatError> {
        let base = self.base + self.pos;
        let data = self.bytes(n)?;
        Ok(ByteReader { data, pos: 0, base })
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.bytes(1)?[0])
    }

    /// Reads a big-endian `u16`.
    pub fn u16(&mut self) -> Result<u16, ClassFormatError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Reads a big-endian `u32`.
    pub fn u32(&mut self) -> Result<u32, ClassFormatError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a big-endian `u64`.
    pub fn u64(&mut self) -> Result<u64, ClassFormatError> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok((hi << 32) | lo)
    }
}

/// Parses a class file, keeping only its linkable structure.
pub fn parse_class(bytes: &[u8]) -> Result<ClassFile, ClassFormatError> {
    let mut r = ByteReader::new(bytes);
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ClassFormatError::BadMagic(magic));
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;
    let pool = read_constant_pool(&mut r)?;
    pool.validate()?;

    let access_flags = r.u16()?;
    let this_class = pool.class_name(r.u16()?)?.to_string();
    let super_index = r.u16()?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(pool.class_name(super_index)?.to_string())
    };

    let interface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(r.u16()?)?.to_string());
    }

    let fields = read_members(&mut r, &pool)?;
    let methods = read_members(&mut r, &pool)?;
    let attributes = read_attributes(&mut r, &pool)?;

    if r.remaining() > 0 {
        return Err(ClassFormatError::TrailingBytes(r.remaining()));
    }

    Ok(ClassFile {
        minor_version,
        major_version,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn read_constant_pool(r: &mut ByteReader<'_>) -> Result<ConstantPool, ClassFormatError> {
    let count = r.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(Constant::Unusable);
    let mut index: u16 = 1;
    while index < count {
        let t = r.u8()?;
        let constant = match t {
            tag::UTF8 => {
                let len = r.u16()? as usize;
                let raw = r.bytes(len)?;
                Constant::Utf8(mutf8::decode(raw).ok_or(ClassFormatError::InvalidUtf8 { index })?)
            }
            tag::INTEGER => Constant::Integer(r.u32()? as i32),
            tag::FLOAT => Constant::Float(r.u32()?),
            tag::LONG => Constant::Long(r.u64()? as i64),
            tag::DOUBLE => Constant::Double(r.u64()?),
            tag::CLASS => Constant::Class(r.u16()?),
            tag::STRING => Constant::String(r.u16()?),
            tag::FIELDREF | tag::METHODREF | tag::INTERFACE_METHODREF => {
                Constant::MemberRef(t, r.u16()?, r.u16()?)
            }
            tag::NAME_AND_TYPE => Constant::NameAndType(r.u16()?, r.u16()?),
            tag::METHOD_HANDLE => Constant::MethodHandle(r.u8()?, r.u16()?),
            tag::METHOD_TYPE => Constant::MethodType(r.u16()?),
            tag::DYNAMIC | tag::INVOKE_DYNAMIC => Constant::Dynamic(t, r.u16()?, r.u16()?),
            tag::MODULE | tag::PACKAGE => Constant::Named(t, r.u16()?),
            _ => return Err(ClassFormatError::UnknownTag { index, tag: t }),
        };
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        entries.push(constant);
        index += 1;
        if wide {
            if index >= count {
                return Err(ClassFormatError::BadIndex {
                    index,
                    expected: "second slot of a Long or Double",
                });
            }
            entries.push(Constant::Unusable);
            index += 1;
        }
    }
    Ok(ConstantPool::from_entries(entries))
}

fn read_members(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<Member>, ClassFormatError> {
    let count = r.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access_flags = r.u16()?;
        let name = pool.utf8(r.u16()?)?.to_string();
        let descriptor = pool.utf8(r.u16()?)?.to_string();
        let attributes = read_attributes(r, pool)?;
        members.push(Member {
            access_flags,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

fn read_attributes(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Attribute>, ClassFormatError> {
    let count = r.u16()?;
    let mut attributes = Vec::new();
    for _ in 0..count {
        let name = pool.utf8(r.u16()?)?;
        let declared = r.u32()?;
        let mut body = r.sub(declared as usize)?;
        let attribute = match name {
            "Signature" => Attribute::Signature(pool.utf8(body.u16()?)?.to_string()),
            "Exceptions" => {
                let n = body.u16()?;
                let mut classes = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    classes.push(pool.class_name(body.u16()?)?.to_string());
                }
                Attribute::Exceptions(classes)
            }
            "InnerClasses" => {
                let n = body.u16()?;
                let mut rows = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let inner = pool.class_name(body.u16()?)?.to_string();
                    let outer = optional(body.u16()?, |i| pool.class_name(i))?;
                    let name = optional(body.u16()?, |i| pool.utf8(i))?;
                    rows.push(InnerClass {
                        inner,
                        outer,
                        name,
                        access_flags: body.u16()?,
                    });
                }
                Attribute::InnerClasses(rows)
            }
            "EnclosingMethod" => {
                let class = pool.class_name(body.u16()?)?.to_string();
                let nat = body.u16()?;
                let method = if nat == 0 {
                    None
                } else {
                    let (n, d) = pool.name_and_type(nat)?;
                    Some((n.to_string(), d.to_string()))
                };
                Attribute::EnclosingMethod { class, method }
            }
            "ConstantValue" => Attribute::ConstantValue(read_const_value(body.u16()?, pool)?),
            "Deprecated" => Attribute::Deprecated,
            "Synthetic" => Attribute::Synthetic,
            "RuntimeVisibleAnnotations" => {
                Attribute::RuntimeVisibleAnnotations(read_annotations(&mut body, pool)?)
            }
            "RuntimeInvisibleAnnotations" => {
                Attribute::RuntimeInvisibleAnnotations(read_annotations(&mut body, pool)?)
            }
            _ => continue,
        };
        if body.remaining() > 0 {
            return Err(ClassFormatError::AttributeLength {
                name: name.to_string(),
                declared,
                actual: body.position(),
            });
        }
        attributes.push(attribute);
    }
    Ok(attributes)
}

fn optional<'p>(
    index: u16,
    resolve: impl FnOnce(u16) -> Result<&'p str, ClassFormatError>,
) -> Result<Option<String>, ClassFormatError> {
    if index == 0 {
        Ok(None)
    } else {
        resolve(index).map(|s| Some(s.to_string()))
    }
}

fn read_const_value(index: u16, pool: &ConstantPool) -> Result<ConstValue, ClassFormatError> {
    Ok(match pool.get(index, "loadable constant")? {
        Constant::Integer(v) => ConstValue::Int(*v),
        Constant::Float(bits) => ConstValue::Float(*bits),
        Constant::Long(v) => ConstValue::Long(*v),
        Constant::Double(bits) => ConstValue::Double(*bits),
        Constant::String(value) => ConstValue::String(pool.utf8(*value)?.to_string()),
        _ => {
            return Err(ClassFormatError::BadIndex {
                index,
                expected: "loadable constant",
            })
        }
    })
}

fn read_annotations(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Annotation>, ClassFormatError> {
    let n = r.u16()?;
    let mut annotations = Vec::with_capacity(n as usize);
    for _ in 0..n {
        annotations.push(read_annotation(r, pool, 0)?);
    }
    Ok(annotations)
}

fn read_annotation(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<Annotation, ClassFormatError> {
    let type_descriptor = pool.utf8(r.u16()?)?.to_string();
    let n = r.u16()?;
    let mut elements = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let name = pool.utf8(r.u16()?)?.to_string();
        elements.push((name, read_element_value(r, pool, depth + 1)?));
    }
    Ok(Annotation {
        type_descriptor,
        elements,
    })
}

/// Reads one element value. `depth` bounds the recursion through nested
/// annotations and arrays, which the writer and renamer also walk.
fn read_element_value(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<ElementValue, ClassFormatError> {
    if depth > MAX_NESTING {
        return Err(ClassFormatError::TooDeep {
            what: "annotation value",
            limit: MAX_NESTING,
        });
    }
    let t = r.u8()?;
    Ok(match t {
        b'B' | b'C' | b'I' | b'S' | b'Z' => {
            let index = r.u16()?;
            match pool.get(index, "Integer")? {
                Constant::Integer(value) => ElementValue::Int { tag: t, value: *value },
                _ => {
                    return Err(ClassFormatError::BadIndex {
                        index,
                        expected: "Integer",
                    })
                }
            }
        }
        b'J' | b'F' | b'D' => {
            let index = r.u16()?;
            match (t, read_const_value(index, pool)?) {
                (b'J', ConstValue::Long(v)) => ElementValue::Long(v),
                (b'F', ConstValue::Float(bits)) => ElementValue::Float(bits),
                (b'D', ConstValue::Double(bits)) => ElementValue::Double(bits),
                _ => {
                    return Err(ClassFormatError::BadIndex {
                        index,
                        expected: "numeric constant matching the element tag",
                    })
                }
            }
        }
        b's' => ElementValue::String(pool.utf8(r.u16()?)?.to_string()),
        b'e' => ElementValue::Enum {
            type_descriptor: pool.utf8(r.u16()?)?.to_string(),
            const_name: pool.utf8(r.u16()?)?.to_string(),
        },
        b'c' => ElementValue::Class(pool.utf8(r.u16()?)?.to_string()),
        b'@' => ElementValue::Annotation(read_annotation(r, pool, depth)?),
        b'[' => {
            let n = r.u16()?;
            let mut values = Vec::with_capacity(n as usize);
            for _ in 0..n {
                values.push(read_element_value(r, pool, depth + 1)?);
            }
            ElementValue::Array(values)
        }
        other => return Err(ClassFormatError::BadElementTag(other as char)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-assembled `public class A extends java/lang/Object {}` with a
    /// `SourceFile` attribute.
    fn minimal_class() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&MAGIC.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&52u16.to_be_bytes());
        b.extend_from_slice(&7u16.to_be_bytes()); // pool count
        let utf8 = |b: &mut Vec<u8>, s: &str| {
            b.push(tag::UTF8);
            b.extend_from_slice(&(s.len() as u16).to_be_bytes());
            b.extend_from_slice(s.as_bytes());
        };
        utf8(&mut b, "A"); // 1
        b.push(tag::CLASS); // 2
        b.extend_from_slice(&1u16.to_be_bytes());
        utf8(&mut b, "java/lang/Object"); // 3
        b.push(tag::CLASS); // 4
        b.extend_from_slice(&3u16.to_be_bytes());
        utf8(&mut b, "SourceFile"); // 5
        utf8(&mut b, "A.java"); // 6
        b.extend_from_slice(&0x0021u16.to_be_bytes());
        b.extend_from_slice(&2u16.to_be_bytes());
        b.extend_from_slice(&4u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        b.extend_from_slice(&0u16.to_be_bytes()); // fields
        b.extend_from_slice(&0u16.to_be_bytes()); // methods
        b.extend_from_slice(&1u16.to_be_bytes()); // attributes
        b.extend_from_slice(&5u16.to_be_bytes());
        b.extend_from_slice(&2u32.to_be_bytes());
        b.extend_from_slice(&6u16.to_be_bytes());
        b
    }

    /// `class A` carrying one annotation whose `value` element is `levels`
    /// nested single-element arrays around a string.
    fn nested_annotation_class(levels: usize) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&MAGIC.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&52u16.to_be_bytes());
        b.extend_from_slice(&8u16.to_be_bytes());
        let utf8 = |b: &mut Vec<u8>, s: &str| {
            b.push(tag::UTF8);
            b.extend_from_slice(&(s.len() as u16).to_be_bytes());
            b.extend_from_slice(s.as_bytes());
        };
        utf8(&mut b, "A"); // 1
        b.push(tag::CLASS); // 2
        b.extend_from_slice(&1u16.to_be_bytes());
        utf8(&mut b, "java/lang/Object"); // 3
        b.push(tag::CLASS); // 4
        b.extend_from_slice(&3u16.to_be_bytes());
        utf8(&mut b, "RuntimeVisibleAnnotations"); // 5
        utf8(&mut b, "LAnn;"); // 6
        utf8(&mut b, "value"); // 7
        b.extend_from_slice(&0x0021u16.to_be_bytes());
        b.extend_from_slice(&2u16.to_be_bytes());
        b.extend_from_slice(&4u16.to_be_bytes());
        b.extend_from_slice(&[0; 6]); // interfaces, fields, methods

        let mut body = Vec::with_capacity(11 + 3 * levels);
        for index in [1u16, 6, 1, 7] {
            body.extend_from_slice(&index.to_be_bytes());
        }
        for _ in 0..levels {
            body.push(b'[');
            body.extend_from_slice(&1u16.to_be_bytes());
        }
        body.push(b's');
        body.extend_from_slice(&7u16.to_be_bytes());

        b.extend_from_slice(&1u16.to_be_bytes());
        b.extend_from_slice(&5u16.to_be_bytes());
        b.extend_from_slice(&(body.len() as u32).to_be_bytes());
        b.extend_from_slice(&body);
        b
    }

    #[test]
    fn parses_minimal_class() {
        let class = parse_class(&minimal_class()).unwrap();
        assert_eq!(class.this_class, "A");
        assert_eq!(class.super_class.as_deref(), Some("java/lang/Object"));
        assert_eq!(class.major_version, 52);
        assert_eq!(class.access_flags, 0x0021);
    }

    #[test]
    fn source_file_is_dropped() {
        let class = parse_class(&minimal_class()).unwrap();
        assert!(class.attributes.is_empty());
    }

    #[test]
    fn bad_magic() {
        let mut bytes = minimal_class();
        bytes[0] = 0;
        assert!(matches!(parse_class(&bytes), Err(ClassFormatError::BadMagic(_))));
    }

    #[test]
    fn truncated_input() {
        let bytes = minimal_class();
        let err = parse_class(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, ClassFormatError::Truncated { .. }));
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = minimal_class();
        bytes.push(0);
        assert_eq!(parse_class(&bytes), Err(ClassFormatError::TrailingBytes(1)));
    }

    #[test]
    fn unknown_tag() {
        let mut bytes = minimal_class();
        bytes[10] = 2;
        assert!(matches!(
            parse_class(&bytes),
            Err(ClassFormatError::UnknownTag { index: 1, tag: 2 })
        ));
    }

    #[test]
    fn not_a_class_at_all() {
        assert!(parse_class(b"PK\x03\x04").is_err());
        assert!(parse_class(&[]).is_err());
    }

    #[test]
    fn moderately_nested_annotation_parses() {
        let class = parse_class(&nested_annotation_class(200)).unwrap();
        let Attribute::RuntimeVisibleAnnotations(list) = &class.attributes[0] else {
            panic!("expected annotations, got {:?}", class.attributes);
        };
        assert_eq!(list[0].type_descriptor, "LAnn;");
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let err = parse_class(&nested_annotation_class(1_000_000)).unwrap_err();
        assert_eq!(
            err,
            ClassFormatError::TooDeep {
                what: "annotation value",
                limit: MAX_NESTING,
            }
        );
    }

    #[test]
    fn reader_sub_tracks_offsets() {
        let data = [1u8, 2, 3, 4];
        let mut r = ByteReader::new(&data);
        r.u8().unwrap();
        let mut sub = r.sub(2).unwrap();
        assert_eq!(sub.u16().unwrap(), 0x0203);
        assert!(matches!(sub.u8(), Err(ClassFormatError::Truncated { offset: 3 })));
        assert_eq!(r.remaining(), 1);
    }
}

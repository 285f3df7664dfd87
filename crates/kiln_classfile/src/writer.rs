//! Encoding the structural model back into class-file bytes.
//!
//! The constant pool is rebuilt from scratch in first-use order while the
//! body is written, so the output depends only on the model.

use crate::constant::PoolBuilder;
use crate::error::ClassFormatError;
use crate::model::{Annotation, Attribute, ClassFile, ConstValue, ElementValue, Member};
use crate::MAGIC;

/// Writes `class` as a class file.
pub fn write_class(class: &ClassFile) -> Result<Vec<u8>, ClassFormatError> {
    let mut pool = PoolBuilder::new();
    let mut body = Vec::new();

    put_u16(&mut body, class.access_flags);
    put_u16(&mut body, pool.class(&class.this_class)?);
    match &class.super_class {
        Some(name) => put_u16(&mut body, pool.class(name)?),
        None => put_u16(&mut body, 0),
    }
    put_len(&mut body, class.interfaces.len(), "interface table")?;
    for interface in &class.interfaces {
        put_u16(&mut body, pool.class(interface)?);
    }
    write_members(&mut body, &mut pool, &class.fields)?;
    write_members(&mut body, &mut pool, &class.methods)?;
    write_attributes(&mut body, &mut pool, &class.attributes)?;

    let mut out = Vec::with_capacity(10 + pool.bytes().len() + body.len());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    put_u16(&mut out, class.minor_version);
    put_u16(&mut out, class.major_version);
    put_u16(&mut out, pool.count());
    out.extend_from_slice(pool.bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_len(out: &mut Vec<u8>, len: usize, what: &'static str) -> Result<(), ClassFormatError> {
    let len = u16::try_from(len).map_err(|_| ClassFormatError::TooLarge { what })?;
    put_u16(out, len);
    Ok(())
}

fn write_members(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    members: &[Member],
) -> Result<(), ClassFormatError> {
    put_len(out, members.len(), "member table")?;
    for member in members {
        put_u16(out, member.access_flags);
        put_u16(out, pool.utf8(&member.name)?);
        put_u16(out, pool.utf8(&member.descriptor)?);
        write_attributes(out, pool, &member.attributes)?;
    }
    Ok(())
}

fn write_attributes(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    attributes: &[Attribute],
) -> Result<(), ClassFormatError> {
    put_len(out, attributes.len(), "attribute table")?;
    for attribute in attributes {
        put_u16(out, pool.utf8(attribute.name())?);
        let mut body = Vec::new();
        match attribute {
            Attribute::Signature(sig) => put_u16(&mut body, pool.utf8(sig)?),
            Attribute::Exceptions(classes) => {
                put_len(&mut body, classes.len(), "exception table")?;
                for class in classes {
                    put_u16(&mut body, pool.class(class)?);
                }
            }
            Attribute::InnerClasses(rows) => {
                put_len(&mut body, rows.len(), "inner class table")?;
                for row in rows {
                    put_u16(&mut body, pool.class(&row.inner)?);
                    match &row.outer {
                        Some(outer) => put_u16(&mut body, pool.class(outer)?),
                        None => put_u16(&mut body, 0),
                    }
                    match &row.name {
                        Some(name) => put_u16(&mut body, pool.utf8(name)?),
                        None => put_u16(&mut body, 0),
                    }
                    put_u16(&mut body, row.access_flags);
                }
            }
            Attribute::EnclosingMethod { class, method } => {
                put_u16(&mut body, pool.class(class)?);
                match method {
                    Some((name, descriptor)) => {
                        put_u16(&mut body, pool.name_and_type(name, descriptor)?)
                    }
                    None => put_u16(&mut body, 0),
                }
            }
            Attribute::ConstantValue(value) => {
                let index = match value {
                    ConstValue::Int(v) => pool.integer(*v)?,
                    ConstValue::Float(bits) => pool.float(*bits)?,
                    ConstValue::Long(v) => pool.long(*v)?,
                    ConstValue::Double(bits) => pool.double(*bits)?,
                    ConstValue::String(s) => pool.string(s)?,
                };
                put_u16(&mut body, index);
            }
            Attribute::Deprecated | Attribute::Synthetic => {}
            Attribute::RuntimeVisibleAnnotations(list)
            | Attribute::RuntimeInvisibleAnnotations(list) => {
                put_len(&mut body, list.len(), "annotation table")?;
                for annotation in list {
                    write_annotation(&mut body, pool, annotation)?;
                }
            }
        }
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
    }
    Ok(())
}

fn write_annotation(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    annotation: &Annotation,
) -> Result<(), ClassFormatError> {
    put_u16(out, pool.utf8(&annotation.type_descriptor)?);
    put_len(out, annotation.elements.len(), "annotation element table")?;
    for (name, value) in &annotation.elements {
        put_u16(out, pool.utf8(name)?);
        write_element_value(out, pool, value)?;
    }
    Ok(())
}

fn write_element_value(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    value: &ElementValue,
) -> Result<(), ClassFormatError> {
    match value {
        ElementValue::Int { tag, value } => {
            out.push(*tag);
            put_u16(out, pool.integer(*value)?);
        }
        ElementValue::Long(v) => {
            out.push(b'J');
            put_u16(out, pool.long(*v)?);
        }
        ElementValue::Float(bits) => {
            out.push(b'F');
            put_u16(out, pool.float(*bits)?);
        }
        ElementValue::Double(bits) => {
            out.push(b'D');
            put_u16(out, pool.double(*bits)?);
        }
        ElementValue::String(s) => {
            out.push(b's');
            put_u16(out, pool.utf8(s)?);
        }
        ElementValue::Enum {
            type_descriptor,
            const_name,
        } => {
            out.push(b'e');
            put_u16(out, pool.utf8(type_descriptor)?);
            put_u16(out, pool.utf8(const_name)?);
        }
        ElementValue::Class(descriptor) => {
            out.push(b'c');
            put_u16(out, pool.utf8(descriptor)?);
        }
        ElementValue::Annotation(nested) => {
            out.push(b'@');
            write_annotation(out, pool, nested)?;
        }
        ElementValue::Array(values) => {
            out.push(b'[');
            put_len(out, values.len(), "annotation array")?;
            for v in values {
                write_element_value(out, pool, v)?;
            }
        }
    }
    Ok(())
}

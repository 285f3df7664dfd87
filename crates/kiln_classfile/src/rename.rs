//! Package-prefix renaming of class references.
//!
//! A [`RenameRule`] moves every class under a mapped package below a target
//! package and prefixes its simple name, so `java/lang/Object` becomes
//! `org/teavm/classlib/java/lang/TObject` under the stock mapping. The rule
//! is applied to names, descriptors, generic signatures and annotations.

use crate::error::ClassFormatError;
use crate::model::{Annotation, Attribute, ClassFile, ElementValue, Member};
use crate::MAX_NESTING;

/// One package mapping, with all names in internal (`/`-separated) form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMapping {
    /// The package being mapped, e.g. `java`. Subpackages are included.
    pub package: String,
    /// The package mapped classes are moved below, e.g. `org/teavm/classlib`.
    pub target: String,
    /// Prefix prepended to the simple class name, e.g. `T`.
    pub class_prefix: String,
}

impl PackageMapping {
    /// Creates a mapping; package names may be given dotted or `/`-separated.
    pub fn new(package: &str, target: &str, class_prefix: &str) -> Self {
        Self {
            package: internal(package),
            target: internal(target),
            class_prefix: class_prefix.to_string(),
        }
    }

    fn matches(&self, class: &str) -> bool {
        class
            .strip_prefix(self.package.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn internal(name: &str) -> String {
    name.trim_matches(|c| c == '.' || c == '/').replace('.', "/")
}

/// An ordered set of package mappings. The longest matching package wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameRule {
    mappings: Vec<PackageMapping>,
}

impl RenameRule {
    /// Builds a rule from mappings in any order.
    pub fn new(mappings: impl IntoIterator<Item = PackageMapping>) -> Self {
        let mut mappings: Vec<_> = mappings.into_iter().collect();
        mappings.sort_by(|a, b| b.package.len().cmp(&a.package.len()));
        Self { mappings }
    }

    /// A rule that renames nothing.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Returns `true` if the rule has no mappings.
    pub fn is_identity(&self) -> bool {
        self.mappings.is_empty()
    }

    /// The mappings, longest package first.
    pub fn mappings(&self) -> &[PackageMapping] {
        &self.mappings
    }

    fn mapping_for(&self, class: &str) -> Option<&PackageMapping> {
        self.mappings.iter().find(|m| m.matches(class))
    }

    /// Renames one internal class name. Unmapped classes are returned unchanged.
    pub fn rename_class(&self, class: &str) -> String {
        let Some(mapping) = self.mapping_for(class) else {
            return class.to_string();
        };
        let (package, simple) = class.rsplit_once('/').unwrap_or(("", class));
        let mut out = String::with_capacity(class.len() + mapping.target.len() + 2);
        if !mapping.target.is_empty() {
            out.push_str(&mapping.target);
            out.push('/');
        }
        out.push_str(package);
        out.push('/');
        out.push_str(&mapping.class_prefix);
        out.push_str(simple);
        out
    }

    /// Renames the operand of a `CONSTANT_Class`, which is an internal name
    /// or, for array classes, a descriptor.
    pub fn rename_class_entry(&self, name: &str) -> Result<String, ClassFormatError> {
        if name.starts_with('[') {
            self.remap_signature(name)
        } else {
            Ok(self.rename_class(name))
        }
    }

    /// Renames every class in a field or method descriptor.
    pub fn remap_descriptor(&self, descriptor: &str) -> Result<String, ClassFormatError> {
        self.remap_signature(descriptor)
    }

    /// Renames every class in a generic signature of a class, method or field.
    ///
    /// Descriptors are a subset of the signature grammar, so this also
    /// accepts them.
    pub fn remap_signature(&self, signature: &str) -> Result<String, ClassFormatError> {
        if self.is_identity() {
            return Ok(signature.to_string());
        }
        SignatureRemapper {
            rule: self,
            sig: signature,
            pos: 0,
            depth: 0,
            out: String::with_capacity(signature.len() + 16),
        }
        .run()
    }

    /// Renames every class reference in `class` in place.
    pub fn rewrite(&self, class: &mut ClassFile) -> Result<(), ClassFormatError> {
        if self.is_identity() {
            return Ok(());
        }
        class.this_class = self.rename_class_entry(&class.this_class)?;
        if let Some(super_class) = &mut class.super_class {
            *super_class = self.rename_class_entry(super_class)?;
        }
        for interface in &mut class.interfaces {
            *interface = self.rename_class_entry(interface)?;
        }
        for member in class.fields.iter_mut().chain(class.methods.iter_mut()) {
            self.rewrite_member(member)?;
        }
        self.rewrite_attributes(&mut class.attributes)
    }

    fn rewrite_member(&self, member: &mut Member) -> Result<(), ClassFormatError> {
        member.descriptor = self.remap_descriptor(&member.descriptor)?;
        self.rewrite_attributes(&mut member.attributes)
    }

    fn rewrite_attributes(&self, attributes: &mut [Attribute]) -> Result<(), ClassFormatError> {
        for attribute in attributes {
            match attribute {
                Attribute::Signature(sig) => *sig = self.remap_signature(sig)?,
                Attribute::Exceptions(classes) => {
                    for class in classes {
                        *class = self.rename_class_entry(class)?;
                    }
                }
                Attribute::InnerClasses(rows) => {
                    for row in rows {
                        row.inner = self.rename_class_entry(&row.inner)?;
                        if let Some(outer) = &mut row.outer {
                            *outer = self.rename_class_entry(outer)?;
                        }
                    }
                }
                Attribute::EnclosingMethod { class, method } => {
                    *class = self.rename_class_entry(class)?;
                    if let Some((_, descriptor)) = method {
                        *descriptor = self.remap_descriptor(descriptor)?;
                    }
                }
                Attribute::RuntimeVisibleAnnotations(list)
                | Attribute::RuntimeInvisibleAnnotations(list) => {
                    for annotation in list {
                        self.rewrite_annotation(annotation)?;
                    }
                }
                Attribute::ConstantValue(_) | Attribute::Deprecated | Attribute::Synthetic => {}
            }
        }
        Ok(())
    }

    fn rewrite_annotation(&self, annotation: &mut Annotation) -> Result<(), ClassFormatError> {
        annotation.type_descriptor = self.remap_descriptor(&annotation.type_descriptor)?;
        for (_, value) in &mut annotation.elements {
            self.rewrite_element(value)?;
        }
        Ok(())
    }

    fn rewrite_element(&self, value: &mut ElementValue) -> Result<(), ClassFormatError> {
        match value {
            ElementValue::Enum {
                type_descriptor, ..
            } => *type_descriptor = self.remap_descriptor(type_descriptor)?,
            ElementValue::Class(descriptor) => *descriptor = self.remap_descriptor(descriptor)?,
            ElementValue::Annotation(nested) => self.rewrite_annotation(nested)?,
            ElementValue::Array(values) => {
                for v in values {
                    self.rewrite_element(v)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Recursive-descent rewriter over the signature grammar of JVMS 4.7.9.1.
struct SignatureRemapper<'a> {
    rule: &'a RenameRule,
    sig: &'a str,
    pos: usize,
    depth: usize,
    out: String,
}

impl<'a> SignatureRemapper<'a> {
    fn run(mut self) -> Result<String, ClassFormatError> {
        if self.sig.is_empty() {
            return Err(self.error());
        }
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.copy(1);
            while self.peek() != Some(b')') {
                self.java_type()?;
            }
            self.copy(1);
            if self.peek() == Some(b'V') {
                self.copy(1);
            } else {
                self.java_type()?;
            }
            while self.peek() == Some(b'^') {
                self.copy(1);
                self.reference_type()?;
            }
        } else {
            while self.peek().is_some() {
                self.java_type()?;
            }
        }
        if self.pos != self.sig.len() {
            return Err(self.error());
        }
        Ok(self.out)
    }

    fn error(&self) -> ClassFormatError {
        ClassFormatError::BadSignature(self.sig.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.sig.as_bytes().get(self.pos).copied()
    }

    fn copy(&mut self, n: usize) {
        self.out.push_str(&self.sig[self.pos..self.pos + n]);
        self.pos += n;
    }

    /// Advances past bytes not in `stops` and returns them. Errors at end of input.
    fn take_until(&mut self, stops: &[u8]) -> Result<&'a str, ClassFormatError> {
        let sig = self.sig;
        let start = self.pos;
        let len = sig.as_bytes()[start..]
            .iter()
            .position(|b| stops.contains(b))
            .ok_or_else(|| self.error())?;
        self.pos += len;
        Ok(&sig[start..start + len])
    }

    fn type_parameters(&mut self) -> Result<(), ClassFormatError> {
        self.copy(1);
        loop {
            match self.peek() {
                Some(b'>') => break,
                None => return Err(self.error()),
                _ => {}
            }
            let ident = self.take_until(b":")?;
            if ident.is_empty() {
                return Err(self.error());
            }
            self.out.push_str(ident);
            while self.peek() == Some(b':') {
                self.copy(1);
                if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                    self.reference_type()?;
                }
            }
        }
        self.copy(1);
        Ok(())
    }

    fn java_type(&mut self) -> Result<(), ClassFormatError> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.copy(1);
                Ok(())
            }
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<(), ClassFormatError> {
        if self.depth == MAX_NESTING {
            return Err(ClassFormatError::TooDeep {
                what: "type signature",
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let result = self.reference_type_at_depth();
        self.depth -= 1;
        result
    }

    fn reference_type_at_depth(&mut self) -> Result<(), ClassFormatError> {
        match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => {
                let len = self.sig[self.pos..]
                    .find(';')
                    .ok_or_else(|| self.error())?;
                self.copy(len + 1);
                Ok(())
            }
            Some(b'[') => {
                self.copy(1);
                self.java_type()
            }
            _ => Err(self.error()),
        }
    }

    fn class_type(&mut self) -> Result<(), ClassFormatError> {
        self.copy(1);
        let name = self.take_until(b"<.;")?;
        if name.is_empty() {
            return Err(self.error());
        }
        let renamed = self.rule.rename_class(name);
        self.out.push_str(&renamed);
        loop {
            match self.peek() {
                Some(b'<') => self.type_arguments()?,
                Some(b'.') => {
                    self.copy(1);
                    let inner = self.take_until(b"<.;")?;
                    self.out.push_str(inner);
                }
                Some(b';') => {
                    self.copy(1);
                    return Ok(());
                }
                _ => return Err(self.error()),
            }
        }
    }

    fn type_arguments(&mut self) -> Result<(), ClassFormatError> {
        self.copy(1);
        loop {
            match self.peek() {
                Some(b'>') => break,
                Some(b'*') => self.copy(1),
                Some(b'+' | b'-') => {
                    self.copy(1);
                    self.reference_type()?;
                }
                Some(_) => self.reference_type()?,
                None => return Err(self.error()),
            }
        }
        self.copy(1);
        Ok(())
    }
}

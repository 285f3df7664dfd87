//! The stdlib class transform: read, decide visibility, rename, write.

use crate::error::ClassFormatError;
use crate::reader::parse_class;
use crate::rename::RenameRule;
use crate::writer::write_class;
use std::path::PathBuf;

/// The result of transforming one class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedClass {
    /// Binary name before renaming, e.g. `java.lang.Object`.
    pub qualified_name: String,
    /// Binary name after renaming, e.g. `org.teavm.classlib.java.lang.TObject`.
    pub rewritten_name: String,
    /// The rewritten class file.
    pub bytes: Vec<u8>,
    /// Whether the class carried the usability marker.
    pub visible: bool,
}

impl TransformedClass {
    /// Path of the rewritten class relative to a classpath root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.class", self.rewritten_name.replace('.', "/")))
    }
}

/// Transforms one class file for inclusion in a library image.
///
/// The class is visible iff it carries an annotation of type `marker`
/// (a field descriptor such as `Lorg/teavm/classlib/PlatformMarker;`) in
/// either annotation table. The marker itself is removed, every class
/// reference is renamed by `rule`, and everything but linkable structure
/// is dropped. The output depends only on the input bytes, `rule` and
/// `marker`.
pub fn transform_class(
    bytes: &[u8],
    rule: &RenameRule,
    marker: &str,
) -> Result<TransformedClass, ClassFormatError> {
    let mut class = parse_class(bytes)?;
    let qualified_name = class.binary_name();
    let visible = class.remove_annotation(marker) > 0;
    rule.rewrite(&mut class)?;
    Ok(TransformedClass {
        qualified_name,
        rewritten_name: class.binary_name(),
        bytes: write_class(&class)?,
        visible,
    })
}

//! The immutable worker layout computed once at startup.

use kiln_classfile::{PackageMapping, RenameRule};
use kiln_common::MethodRef;
use kiln_config::{resolve_paths, ResolvedPaths, WorkerConfig};
use std::fs;
use std::io;
use std::path::Path;

/// Everything about the environment a pipeline needs that never changes
/// after startup: scratch paths, the stdlib rename rule, and the entry point.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Absolute scratch locations.
    pub paths: ResolvedPaths,
    /// Rule mapping stdlib class names into the library image.
    pub rename_rule: RenameRule,
    /// Annotation descriptor marking a stdlib class as usable.
    pub marker: String,
    /// The fixed entry point `<Class>.<method>([Ljava/lang/String;)V`.
    pub entry_point: MethodRef,
    /// Simple name of the single externally-visible class.
    pub entry_class: String,
    /// Whether the backend minifies its output.
    pub minify: bool,
    /// Whether the backend runs incrementally against the caches.
    pub incremental: bool,
    /// File name of the generated script.
    pub output_name: String,
}

impl Layout {
    /// Derives the layout from validated configuration.
    pub fn initialize(config: &WorkerConfig, root_override: Option<&Path>) -> Self {
        let rename_rule = RenameRule::new(config.stdlib.mapping.iter().map(|m| {
            PackageMapping::new(&m.package, &m.target, &m.class_prefix)
        }));
        Self {
            paths: resolve_paths(config, root_override),
            rename_rule,
            marker: config.stdlib.marker.clone(),
            entry_point: MethodRef::entry_point(&config.entry.class, &config.entry.method),
            entry_class: config.entry.class.clone(),
            minify: config.backend.minify,
            incremental: config.backend.incremental,
            output_name: config.backend.output_name.clone(),
        }
    }
}

/// Empties the scratch area `dir`, creating it if needed.
pub(crate) fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

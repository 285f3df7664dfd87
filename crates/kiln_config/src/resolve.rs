//! Resolution of the configured scratch names into absolute paths.

use crate::types::WorkerConfig;
use std::path::{Path, PathBuf};

/// Absolute locations of every scratch area the worker mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Root all other paths are resolved against.
    pub root: PathBuf,
    /// The canonical compilation unit file (`<unit_dir>/<EntryClass>.java`).
    pub unit_file: PathBuf,
    /// Output directory of the source compiler.
    pub class_output: PathBuf,
    /// Output directory of the backend compiler.
    pub script_output: PathBuf,
    /// The generated script (`<script_output>/<output_name>`).
    pub script_file: PathBuf,
    /// Where the fetched stdlib archive is unpacked.
    pub stdlib_staging: PathBuf,
    /// Where the rewritten, filtered stdlib classes are written.
    pub library_image: PathBuf,
    /// The filtered stdlib classes under their original names.
    pub boot_image: PathBuf,
}

/// Resolves every scratch name in `config` against a root directory.
///
/// The root is taken from `root_override` if given, then from
/// `paths.root`, and finally defaults to `<tmp>/kiln`.
pub fn resolve_paths(config: &WorkerConfig, root_override: Option<&Path>) -> ResolvedPaths {
    let root = root_override
        .map(Path::to_path_buf)
        .or_else(|| config.paths.root.clone())
        .unwrap_or_else(|| std::env::temp_dir().join("kiln"));
    let paths = &config.paths;
    let script_output = root.join(&paths.script_output);
    ResolvedPaths {
        unit_file: root
            .join(&paths.unit_dir)
            .join(format!("{}.java", config.entry.class)),
        class_output: root.join(&paths.class_output),
        script_file: script_output.join(&config.backend.output_name),
        script_output,
        stdlib_staging: root.join(&paths.stdlib_staging),
        library_image: root.join(&paths.library_image),
        boot_image: root.join(&paths.boot_image),
        root,
    }
}

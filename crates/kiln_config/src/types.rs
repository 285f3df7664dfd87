//! Configuration types deserialized from `kiln.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// The top-level worker configuration parsed from `kiln.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct WorkerConfig {
    /// Scratch directory layout.
    #[serde(default)]
    pub paths: PathsConfig,
    /// The fixed entry point every compilation unit must provide.
    #[serde(default)]
    pub entry: EntryConfig,
    /// Backend compiler settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Source compiler settings.
    #[serde(default)]
    pub source: SourceConfig,
    /// Standard-library preparation settings.
    #[serde(default)]
    pub stdlib: StdlibConfig,
}

/// Names of the scratch areas, relative to `root`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of every scratch area. Defaults to `<tmp>/kiln`.
    pub root: Option<PathBuf>,
    /// Directory the compilation unit is written into.
    pub unit_dir: String,
    /// Output directory of the source compiler.
    pub class_output: String,
    /// Output directory of the backend compiler.
    pub script_output: String,
    /// Where the fetched stdlib archive is unpacked.
    pub stdlib_staging: String,
    /// Where the rewritten, filtered stdlib classes are written.
    pub library_image: String,
    /// Where the filtered stdlib classes are written under their original
    /// names, as the source compiler's boot classpath.
    pub boot_image: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: None,
            unit_dir: ".".to_string(),
            class_output: "out".to_string(),
            script_output: "js-out".to_string(),
            stdlib_staging: "teavm-stdlib".to_string(),
            library_image: "stdlib".to_string(),
            boot_image: "boot-stdlib".to_string(),
        }
    }
}

/// The fixed entry point: `<class>.<method>(String[])void`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Simple name of the single externally-visible class.
    pub class: String,
    /// Name of the entry method.
    pub method: String,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            class: "Hello".to_string(),
            method: "main".to_string(),
        }
    }
}

/// Backend compiler settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Whether to emit minified script output.
    pub minify: bool,
    /// Whether to run lowering incrementally against the artifact caches.
    pub incremental: bool,
    /// File name of the generated script inside the script output directory.
    pub output_name: String,
    /// Command line of an external lowering tool, for the process adapter.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub command: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            minify: false,
            incremental: true,
            output_name: "classes.js".to_string(),
            command: Vec::new(),
        }
    }
}

/// Source compiler settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Executable of the external source compiler.
    pub javac: String,
    /// Extra arguments passed before the output directory and unit path.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub args: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            javac: "javac".to_string(),
            args: vec!["-verbose".to_string()],
        }
    }
}

/// Standard-library preparation settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StdlibConfig {
    /// Descriptor of the annotation that marks a class as usable.
    pub marker: String,
    /// Package mappings applied to every class reference.
    pub mapping: Vec<PackageMapping>,
}

impl Default for StdlibConfig {
    fn default() -> Self {
        Self {
            marker: "Lorg/teavm/classlib/PlatformMarker;".to_string(),
            mapping: vec![PackageMapping {
                package: "java".to_string(),
                target: "org.teavm.classlib".to_string(),
                class_prefix: "T".to_string(),
            }],
        }
    }
}

/// Moves classes of `package` under `target` and prefixes their simple names.
///
/// Package names are written with dots, as in source code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageMapping {
    /// The package being mapped, e.g. `java`.
    pub package: String,
    /// The package prepended to mapped classes, e.g. `org.teavm.classlib`.
    #[serde(default)]
    pub target: String,
    /// Prefix prepended to the simple class name, e.g. `T`.
    #[serde(default)]
    pub class_prefix: String,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `args = "-g"` as well as `args = ["-g", "-nowarn"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn source_args_single_string() {
        let config = load_config_from_str("[source]\nargs = \"-g\"\n").unwrap();
        assert_eq!(config.source.args, vec!["-g"]);
    }

    #[test]
    fn source_args_list() {
        let config = load_config_from_str("[source]\nargs = [\"-g\", \"-nowarn\"]\n").unwrap();
        assert_eq!(config.source.args, vec!["-g", "-nowarn"]);
    }

    #[test]
    fn backend_command_list() {
        let config =
            load_config_from_str("[backend]\ncommand = [\"teavm\", \"--no-minify\"]\n").unwrap();
        assert_eq!(config.backend.command, vec!["teavm", "--no-minify"]);
        assert!(!config.backend.minify);
        assert!(config.backend.incremental);
    }

    #[test]
    fn mapping_defaults_target_and_prefix() {
        let toml = r#"
[[stdlib.mapping]]
package = "javax"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.stdlib.mapping.len(), 1);
        assert_eq!(config.stdlib.mapping[0].target, "");
        assert_eq!(config.stdlib.mapping[0].class_prefix, "");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = load_config_from_str("[paths]\nclass_output = \"classes\"\n").unwrap();
        assert_eq!(config.paths.class_output, "classes");
        assert_eq!(config.paths.library_image, "stdlib");
        assert!(config.paths.root.is_none());
    }
}

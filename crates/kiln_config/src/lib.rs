//! Parsing and validation of `kiln.toml` worker configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! layout of the stock deployment: a `Hello` entry class, the classlib
//! rename rule `java` → `org.teavm.classlib` with class prefix `T`, and
//! non-minified incremental backend output to `classes.js`.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use resolve::{resolve_paths, ResolvedPaths};
pub use types::*;

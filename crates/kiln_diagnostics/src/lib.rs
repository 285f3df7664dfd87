//! Diagnostic normalization and streaming for the kiln compile worker.
//!
//! Two compilers report problems in two different shapes: the source compiler
//! produces [`SourceDiagnostic`]s with byte positions, the backend compiler
//! produces [`Problem`]s with a call location and parameterized text. Both are
//! normalized into one wire [`Diagnostic`] record and pushed to a
//! [`DiagnosticSink`] the instant they are produced.

#![warn(missing_docs)]

pub mod diagnostic;
pub mod problem;
pub mod renderer;
pub mod severity;
pub mod sink;
pub mod source;

pub use diagnostic::{Diagnostic, SourceRef, NOPOS};
pub use problem::{CallLocation, Problem};
pub use renderer::{DiagnosticRenderer, LogRenderer};
pub use severity::Severity;
pub use sink::{CollectingSink, CountingSink, DiagnosticSink};
pub use source::{SourceDiagnostic, SourceObject};

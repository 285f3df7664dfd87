//! The normalized wire record every compiler output is converted into.

use crate::problem::Problem;
use crate::severity::Severity;
use crate::source::SourceDiagnostic;
use serde::{Deserialize, Serialize};

/// Position value meaning "unknown", as used by the source compiler.
pub const NOPOS: i64 = -1;

/// Source kind reported for problems found by the backend compiler.
pub const BACKEND_SOURCE_KIND: &str = "BACKEND";

/// The object a diagnostic refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Object kind (`SOURCE`, `CLASS`, `BACKEND`, ...).
    pub kind: String,
    /// Object name; empty when the compiler reported none.
    pub name: String,
}

/// A normalized diagnostic, serialized as the payload of a `diagnostic` message.
///
/// Field names serialize in camelCase to match the message protocol
/// (`startPosition`, `endPosition`, ...). Unknown positions are [`NOPOS`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// What the diagnostic is attached to.
    pub source: SourceRef,
    /// Start offset of the offending range.
    pub start_position: i64,
    /// Preferred caret offset.
    pub position: i64,
    /// End offset of the offending range.
    pub end_position: i64,
    /// 1-based line.
    pub line: i64,
    /// 1-based column.
    pub column: i64,
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Normalized severity.
    pub severity: Severity,
}

impl Diagnostic {
    /// Returns `true` if this diagnostic fails the request.
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl From<&SourceDiagnostic> for Diagnostic {
    fn from(diag: &SourceDiagnostic) -> Self {
        let source = match &diag.source {
            Some(object) => SourceRef {
                kind: object.kind.clone(),
                name: object.name.clone(),
            },
            None => SourceRef {
                kind: "OTHER".to_string(),
                name: String::new(),
            },
        };
        Self {
            source,
            start_position: diag.start_position,
            position: diag.position,
            end_position: diag.end_position,
            line: diag.line,
            column: diag.column,
            code: diag.code.clone(),
            message: diag.message.clone(),
            severity: Severity::from_kind_name(&diag.kind),
        }
    }
}

impl From<&Problem> for Diagnostic {
    fn from(problem: &Problem) -> Self {
        let location = problem.location.as_ref();
        let name = location
            .and_then(|loc| {
                loc.file
                    .clone()
                    .or_else(|| loc.method.as_ref().map(|m| m.to_string()))
            })
            .unwrap_or_default();
        let line = location
            .and_then(|loc| loc.line)
            .map_or(NOPOS, i64::from);
        Self {
            source: SourceRef {
                kind: BACKEND_SOURCE_KIND.to_string(),
                name,
            },
            start_position: NOPOS,
            position: NOPOS,
            end_position: NOPOS,
            line,
            column: NOPOS,
            code: format!("backend.{}", problem.severity),
            message: problem.message(),
            severity: problem.severity,
        }
    }
}

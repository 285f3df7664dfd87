//! Diagnostic severity levels ordered from least to most severe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity level of a diagnostic.
///
/// Ordered from least severe (`Note`) to most severe (`Error`), matching the
/// derived `PartialOrd`/`Ord` implementation based on declaration order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// An informational note providing additional context.
    Note,
    /// A potential issue that doesn't prevent compilation.
    Warning,
    /// A definite problem that fails the request.
    Error,
}

impl Severity {
    /// Returns `true` if this severity is [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Maps a source compiler's diagnostic kind name onto a severity.
    ///
    /// Recognizes `ERROR`, `WARNING`, `MANDATORY_WARNING`, `NOTE` and `OTHER`
    /// case-insensitively; anything unknown is treated as a note.
    pub fn from_kind_name(kind: &str) -> Self {
        match kind.to_ascii_uppercase().as_str() {
            "ERROR" => Severity::Error,
            "WARNING" | "MANDATORY_WARNING" => Severity::Warning,
            _ => Severity::Note,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

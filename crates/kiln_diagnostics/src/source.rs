//! Diagnostics in the shape reported by the source compiler.

/// The compilation object a source diagnostic refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceObject {
    /// Object kind as reported by the compiler (`SOURCE`, `CLASS`, `OTHER`, ...).
    pub kind: String,
    /// Object name, usually the path of the compilation unit.
    pub name: String,
}

/// One diagnostic as produced by the source-language compiler.
///
/// Positions are character offsets into the unit; the compiler reports
/// [`NOPOS`](crate::NOPOS) (`-1`) for any position it doesn't know. The
/// `kind` is the compiler's own severity name (`ERROR`, `WARNING`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDiagnostic {
    /// The compiler's severity name.
    pub kind: String,
    /// The object the diagnostic is attached to, if any.
    pub source: Option<SourceObject>,
    /// Start offset of the offending range.
    pub start_position: i64,
    /// Preferred caret offset.
    pub position: i64,
    /// End offset of the offending range.
    pub end_position: i64,
    /// 1-based line of `position`.
    pub line: i64,
    /// 1-based column of `position`.
    pub column: i64,
    /// Machine-readable message key (e.g. `compiler.err.expected`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl SourceDiagnostic {
    /// Creates an error diagnostic for `name` with unknown positions.
    pub fn error(name: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: "ERROR".to_string(),
            source: Some(SourceObject {
                kind: "SOURCE".to_string(),
                name: name.into(),
            }),
            start_position: crate::NOPOS,
            position: crate::NOPOS,
            end_position: crate::NOPOS,
            line: crate::NOPOS,
            column: crate::NOPOS,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Sets the line and column of this diagnostic.
    pub fn at(mut self, line: i64, column: i64) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Sets the start, caret and end offsets of this diagnostic.
    pub fn with_range(mut self, start: i64, position: i64, end: i64) -> Self {
        self.start_position = start;
        self.position = position;
        self.end_position = end;
        self
    }
}

//! Problems in the shape reported by the backend compiler.

use crate::severity::Severity;
use kiln_common::MethodRef;

/// Where in the program a backend problem was detected.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CallLocation {
    /// The method being analyzed when the problem was found.
    pub method: Option<MethodRef>,
    /// Source file name from debug information, if known.
    pub file: Option<String>,
    /// Source line from debug information, if known.
    pub line: Option<u32>,
}

/// One problem reported by the backend compiler.
///
/// `text` may contain placeholders of the form `{{c0}}`, `{{m1}}`, `{{f2}}`
/// or `{{t3}}`; the digit indexes into `params` and the letter (class,
/// method, field, type) is informational only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    /// Problem severity.
    pub severity: Severity,
    /// Location of the problem, if the backend knows one.
    pub location: Option<CallLocation>,
    /// Message template.
    pub text: String,
    /// Values substituted into `text`.
    pub params: Vec<String>,
}

impl Problem {
    /// Creates an error problem with no location.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location: None,
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Creates a warning problem with no location.
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(text)
        }
    }

    /// Adds a template parameter.
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Sets the problem location.
    pub fn at(mut self, location: CallLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns `text` with every well-formed placeholder replaced by its parameter.
    ///
    /// Placeholders whose index is out of range are left untouched.
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}").and_then(|end| {
                self.placeholder(&after[..end])
                    .map(|value| (end, value))
            }) {
                Some((end, value)) => {
                    out.push_str(value);
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn placeholder(&self, body: &str) -> Option<&str> {
        let mut chars = body.chars();
        let tag = chars.next()?;
        if !matches!(tag, 'c' | 'm' | 'f' | 't') {
            return None;
        }
        let index: usize = chars.as_str().parse().ok()?;
        self.params.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        let p = Problem::error("Method {{m0}} was not found in {{c1}}")
            .with_param("foo()V")
            .with_param("Hello");
        assert_eq!(p.message(), "Method foo()V was not found in Hello");
    }

    #[test]
    fn leaves_unknown_placeholders() {
        let p = Problem::error("bad {{x0}} and {{c5}} and {{c0");
        assert_eq!(p.message(), "bad {{x0}} and {{c5}} and {{c0");
    }

    #[test]
    fn warning_keeps_text() {
        let p = Problem::warning("slow path");
        assert_eq!(p.severity, Severity::Warning);
        assert_eq!(p.message(), "slow path");
    }
}

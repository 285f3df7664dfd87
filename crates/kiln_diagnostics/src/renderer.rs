//! Text rendering of diagnostics for the worker log.

use crate::diagnostic::{Diagnostic, NOPOS};
use crate::problem::Problem;

/// Trait for rendering diagnostics into formatted strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders a backend problem.
    fn render_problem(&self, problem: &Problem) -> String;
}

/// Renders diagnostics as compact single lines suitable for a log stream.
///
/// Produces output like:
/// ```text
/// /Hello.java:3:19: error[compiler.err.expected]: ';' expected
/// ```
/// and for backend problems:
/// ```text
/// ERROR: Method Hello.foo()V was not found
///     at Hello.main([Ljava/lang/String;)V(Hello.java:4)
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRenderer;

impl DiagnosticRenderer for LogRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();
        if !diag.source.name.is_empty() {
            out.push_str(&diag.source.name);
            if diag.line != NOPOS {
                out.push_str(&format!(":{}", diag.line));
                if diag.column != NOPOS {
                    out.push_str(&format!(":{}", diag.column));
                }
            }
            out.push_str(": ");
        }
        out.push_str(&format!("{}[{}]: {}", diag.severity, diag.code, diag.message));
        out
    }

    fn render_problem(&self, problem: &Problem) -> String {
        let mut out = format!(
            "{}: {}",
            problem.severity.to_string().to_uppercase(),
            problem.message()
        );
        if let Some(location) = &problem.location {
            let method = location
                .method
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            out.push_str(&format!("\n    at {method}"));
            if let Some(file) = &location.file {
                match location.line {
                    Some(line) => out.push_str(&format!("({file}:{line})")),
                    None => out.push_str(&format!("({file})")),
                }
            }
        }
        out
    }
}

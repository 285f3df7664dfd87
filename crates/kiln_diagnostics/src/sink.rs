//! Destinations for streamed diagnostics.

use crate::diagnostic::Diagnostic;

/// Receives diagnostics one at a time, in the order they are produced.
///
/// Implementations must not buffer for reordering: the worker relies on a
/// sink forwarding each diagnostic before the compiler produces the next one.
pub trait DiagnosticSink {
    /// Accepts one diagnostic.
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl<F: FnMut(Diagnostic)> DiagnosticSink for F {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// A sink that keeps every diagnostic it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl CollectingSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if any error-severity diagnostic was received.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Returns the number of error-severity diagnostics received.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Returns the received diagnostics in arrival order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Takes all received diagnostics, leaving the sink empty.
    ///
    /// The error count is not reset.
    pub fn take_all(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Forwards to an inner sink while counting what passes through.
pub struct CountingSink<'a> {
    inner: &'a mut dyn DiagnosticSink,
    emitted: usize,
    errors: usize,
}

impl<'a> CountingSink<'a> {
    /// Wraps `inner`.
    pub fn new(inner: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            inner,
            emitted: 0,
            errors: 0,
        }
    }

    /// Number of diagnostics forwarded so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Number of error-severity diagnostics forwarded so far.
    pub fn errors(&self) -> usize {
        self.errors
    }
}

impl DiagnosticSink for CountingSink<'_> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.emitted += 1;
        if diagnostic.is_error() {
            self.errors += 1;
        }
        self.inner.emit(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Problem;
    use crate::source::SourceDiagnostic;

    fn make_error() -> Diagnostic {
        Diagnostic::from(&SourceDiagnostic::error("/Hello.java", "e", "test error"))
    }

    fn make_warning() -> Diagnostic {
        Diagnostic::from(&Problem::warning("test warning"))
    }

    #[test]
    fn empty_sink() {
        let mut sink = CollectingSink::new();
        assert!(!sink.has_errors());
        assert_eq!(sink.error_count(), 0);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn emit_error() {
        let mut sink = CollectingSink::new();
        sink.emit(make_error());
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn emit_warning_not_error() {
        let mut sink = CollectingSink::new();
        sink.emit(make_warning());
        assert!(!sink.has_errors());
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn take_all_drains_but_keeps_count() {
        let mut sink = CollectingSink::new();
        sink.emit(make_error());
        sink.emit(make_warning());
        assert_eq!(sink.take_all().len(), 2);
        assert!(sink.take_all().is_empty());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |d: Diagnostic| seen.push(d.message);
            sink.emit(make_error());
            sink.emit(make_warning());
        }
        assert_eq!(seen, vec!["test error", "test warning"]);
    }

    #[test]
    fn counting_sink_forwards_in_order() {
        let mut inner = CollectingSink::new();
        let mut counting = CountingSink::new(&mut inner);
        counting.emit(make_warning());
        counting.emit(make_error());
        assert_eq!(counting.emitted(), 2);
        assert_eq!(counting.errors(), 1);
        let messages: Vec<_> = inner.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["test warning", "test error"]);
    }
}

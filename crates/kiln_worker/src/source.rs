//! The source-compiler seam and an adapter for an external `javac`.

use crate::error::CompileError;
use kiln_diagnostics::{SourceDiagnostic, SourceObject, NOPOS};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

/// One invocation of the source compiler.
#[derive(Debug, Clone, Copy)]
pub struct SourceTask<'a> {
    /// The compilation unit.
    pub unit: &'a Path,
    /// Directory class files are written into.
    pub output_dir: &'a Path,
    /// The boot image: the visible platform classes under their original
    /// names, used in place of the JDK's own.
    pub boot_classpath: &'a Path,
}

/// Compiles one unit to class files.
///
/// Every diagnostic must be passed to `listener` as soon as the compiler
/// produces it. Returns whether the compiler reported success; `Err` is
/// reserved for failing to run the compiler at all. Compilers run on a
/// blocking thread, away from the task reading requests.
pub trait SourceCompiler: Send {
    /// Runs the compiler.
    fn compile(
        &mut self,
        task: &SourceTask<'_>,
        listener: &mut dyn FnMut(SourceDiagnostic),
    ) -> Result<bool, CompileError>;
}

/// Language level the unit is compiled at. javac 9 and later only accept
/// a boot classpath together with a pre-module source and target level.
pub const LANGUAGE_LEVEL: &str = "8";

/// Drives an external `javac` with `-XDrawDiagnostics`, parsing each
/// diagnostic line from its error stream as it arrives.
///
/// The unit is compiled at [`LANGUAGE_LEVEL`] against the boot image only,
/// with the `options` lint off so newer compilers do not warn that the
/// level is obsolete.
#[derive(Debug, Clone)]
pub struct JavacCompiler {
    program: String,
    args: Vec<String>,
}

impl JavacCompiler {
    /// Creates an adapter for `program`, passing `args` before the
    /// worker's own options.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, task: &SourceTask<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("-XDrawDiagnostics")
            .args(["-source", LANGUAGE_LEVEL, "-target", LANGUAGE_LEVEL])
            .arg("-Xlint:-options")
            .arg("-bootclasspath")
            .arg(task.boot_classpath)
            .arg("-d")
            .arg(task.output_dir)
            .arg(task.unit)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl SourceCompiler for JavacCompiler {
    fn compile(
        &mut self,
        task: &SourceTask<'_>,
        listener: &mut dyn FnMut(SourceDiagnostic),
    ) -> Result<bool, CompileError> {
        let tool_error = |reason: String| CompileError::Tool {
            tool: self.program.clone(),
            reason,
        };
        let mut child = self
            .command(task)
            .spawn()
            .map_err(|e| tool_error(e.to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            for line in BufReader::new(stderr).lines() {
                let line = line.map_err(|e| tool_error(e.to_string()))?;
                match parse_raw_diagnostic(&line) {
                    Some(diag) => listener(diag),
                    None => log::debug!("javac: {line}"),
                }
            }
        }
        let status = child.wait().map_err(|e| tool_error(e.to_string()))?;
        Ok(status.success())
    }
}

/// Parses one line of `-XDrawDiagnostics` output.
///
/// Positioned diagnostics look like `/w/Hello.java:3:9: compiler.err.expected: ';'`;
/// unpositioned ones start with `- ` or with the key itself, and javac's
/// `Fatal Error:` lines become [`FATAL_CODE`] errors. Returns `None`
/// for lines that are not diagnostics (verbose progress, source excerpts).
pub fn parse_raw_diagnostic(line: &str) -> Option<SourceDiagnostic> {
    let line = line.trim_end();
    if let Some(message) = line.strip_prefix("Fatal Error: ") {
        return Some(unpositioned("ERROR", FATAL_CODE, message));
    }
    let (location, rest) = if let Some(rest) = line.strip_prefix("- ") {
        (None, rest)
    } else if line.starts_with("compiler.") {
        (None, line)
    } else {
        let at = line.find(": compiler.")?;
        (Some(&line[..at]), &line[at + 2..])
    };

    let (code, message) = match rest.split_once(": ") {
        Some((code, message)) => (code, message),
        None => (rest, ""),
    };
    if !code.starts_with("compiler.") || code.contains(' ') {
        return None;
    }

    let mut diag = unpositioned(kind_of(code), code, message);
    if let Some(location) = location {
        let mut parts = location.rsplitn(3, ':');
        let column = parts.next()?.parse().ok()?;
        let line_no = parts.next()?.parse().ok()?;
        let file = parts.next()?;
        diag.source = Some(SourceObject {
            kind: "SOURCE".to_string(),
            name: file.to_string(),
        });
        diag = diag.at(line_no, column);
    }
    Some(diag)
}

/// Key given to javac's unkeyed `Fatal Error:` lines, such as a boot
/// classpath without `java.lang`.
pub const FATAL_CODE: &str = "compiler.err.fatal";

fn unpositioned(kind: &str, code: &str, message: &str) -> SourceDiagnostic {
    SourceDiagnostic {
        kind: kind.to_string(),
        source: None,
        start_position: NOPOS,
        position: NOPOS,
        end_position: NOPOS,
        line: NOPOS,
        column: NOPOS,
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Maps a diagnostic key to the compiler's severity name.
fn kind_of(code: &str) -> &'static str {
    if code.starts_with("compiler.err.") {
        "ERROR"
    } else if code.starts_with("compiler.warn.") {
        "WARNING"
    } else {
        "NOTE"
    }
}

//! The backend-compiler seam: lowering class files to a script.

use crate::error::CompileError;
use kiln_cache::ArtifactCaches;
use kiln_classfile::RenameRule;
use kiln_common::MethodRef;
use kiln_diagnostics::{CallLocation, Problem};
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A directory of class files on the backend's classpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathEntry {
    /// Root directory of the class files.
    pub path: PathBuf,
    /// How original class names map to file names below `path`, if they differ.
    pub mapping: Option<RenameRule>,
}

impl ClasspathEntry {
    /// A directory whose file names match class names.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mapping: None,
        }
    }

    /// A directory holding classes renamed by `rule`.
    pub fn mapped(path: impl Into<PathBuf>, rule: RenameRule) -> Self {
        Self {
            path: path.into(),
            mapping: Some(rule),
        }
    }

    /// The file that holds class `internal_name` in this entry.
    pub fn class_file(&self, internal_name: &str) -> PathBuf {
        let name = match &self.mapping {
            Some(rule) => rule.rename_class(internal_name),
            None => internal_name.to_string(),
        };
        self.path.join(format!("{name}.class"))
    }
}

/// Everything one backend build needs.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    /// Class sources, searched in order.
    pub classpath: Vec<ClasspathEntry>,
    /// The method the generated program starts at.
    pub entry_point: &'a MethodRef,
    /// Whether to emit minified output.
    pub minify: bool,
    /// Whether to reuse and fill the artifact caches.
    pub incremental: bool,
    /// Directory the script is written into.
    pub output_dir: &'a Path,
    /// File name of the script.
    pub output_name: &'a str,
}

/// The named stages a backend build moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Discovering reachable classes and methods.
    DependencyAnalysis,
    /// Resolving references between classes.
    Linking,
    /// Optimizing the intermediate representation.
    Optimization,
    /// Rebuilding structured syntax from the intermediate representation.
    Decompilation,
    /// Writing the script.
    Rendering,
}

impl Phase {
    /// All phases in the order a build runs them.
    pub const ALL: [Phase; 5] = [
        Phase::DependencyAnalysis,
        Phase::Linking,
        Phase::Optimization,
        Phase::Decompilation,
        Phase::Rendering,
    ];

    /// Upper-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Phase::DependencyAnalysis => "DEPENDENCY_ANALYSIS",
            Phase::Linking => "LINKING",
            Phase::Optimization => "OPTIMIZATION",
            Phase::Decompilation => "DECOMPILATION",
            Phase::Rendering => "RENDERING",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A listener's answer to a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressFeedback {
    /// Keep going.
    Continue,
    /// Stop the build as soon as possible.
    Cancel,
}

/// Observes a backend build.
pub trait ProgressListener {
    /// A phase with `count` units of work has started.
    fn phase_started(&mut self, phase: Phase, count: usize) -> ProgressFeedback;

    /// `progress` units of the current phase are done.
    fn progress_reached(&mut self, progress: usize) -> ProgressFeedback;
}

/// Lowers a program to a script.
///
/// Returns every problem found; an error-level problem fails the build
/// even if a script was written. `Err` is reserved for failing to run
/// the backend at all.
pub trait BackendCompiler: Send {
    /// Runs one build.
    fn build(
        &mut self,
        request: &BuildRequest<'_>,
        caches: &mut ArtifactCaches,
        progress: &mut dyn ProgressListener,
    ) -> Result<Vec<Problem>, CompileError>;
}

/// Drives an external lowering tool with a TeaVM-style command line:
/// `-p <classpath>... -d <dir> -f <file> [--minify] [--incremental] <MainClass>`.
///
/// Lines of its output starting with `ERROR: ` or `WARNING: ` become
/// problems and known progress lines become phase reports. The in-memory
/// caches cannot be shared with another process and are left untouched:
/// `--incremental` only asks the tool to reuse its own on-disk state.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: Vec<String>,
}

impl ProcessBackend {
    /// Creates an adapter for `command` (program followed by fixed arguments).
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn command(&self, program: &str, request: &BuildRequest<'_>) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..]);
        for entry in &request.classpath {
            cmd.arg("-p").arg(&entry.path);
        }
        cmd.arg("-d")
            .arg(request.output_dir)
            .arg("-f")
            .arg(request.output_name);
        if request.minify {
            cmd.arg("--minify");
        }
        if request.incremental {
            cmd.arg("--incremental");
        }
        cmd.arg(request.entry_point.class.replace('/', "."))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd
    }
}

impl BackendCompiler for ProcessBackend {
    fn build(
        &mut self,
        request: &BuildRequest<'_>,
        _caches: &mut ArtifactCaches,
        progress: &mut dyn ProgressListener,
    ) -> Result<Vec<Problem>, CompileError> {
        let Some(program) = self.command.first() else {
            return Err(CompileError::Tool {
                tool: "backend".to_string(),
                reason: "no command configured in [backend] command".to_string(),
            });
        };
        let tool_error = |reason: String| CompileError::Tool {
            tool: program.clone(),
            reason,
        };
        let mut child = self
            .command(program, request)
            .spawn()
            .map_err(|e| tool_error(e.to_string()))?;

        let mut problems: Vec<Problem> = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let line = line.map_err(|e| tool_error(e.to_string()))?;
                if let Some(problem) = parse_problem_line(&line) {
                    problems.push(problem);
                } else if let Some(phase) = phase_of_line(&line) {
                    progress.phase_started(phase, 0);
                } else if let (Some(location), Some(last)) =
                    (parse_call_location(&line), problems.last_mut())
                {
                    last.location.get_or_insert(location);
                } else {
                    log::debug!("backend: {line}");
                }
            }
        }
        let status = child.wait().map_err(|e| tool_error(e.to_string()))?;
        if !status.success() && !problems.iter().any(|p| p.severity.is_error()) {
            problems.push(Problem::error(format!("backend exited with {status}")));
        }
        Ok(problems)
    }
}

/// Parses an `ERROR: ...` or `WARNING: ...` output line.
fn parse_problem_line(line: &str) -> Option<Problem> {
    if let Some(text) = line.strip_prefix("ERROR: ") {
        Some(Problem::error(text))
    } else {
        line.strip_prefix("WARNING: ").map(Problem::warning)
    }
}

/// Parses a `    at Hello.main(Hello.java:4)` line following a problem.
fn parse_call_location(line: &str) -> Option<CallLocation> {
    let rest = line.trim_start().strip_prefix("at ")?;
    let (_, inside) = rest.trim_end().strip_suffix(')')?.rsplit_once('(')?;
    let (file, line) = match inside.rsplit_once(':') {
        Some((file, line)) => (file, line.parse().ok()),
        None => (inside, None),
    };
    Some(CallLocation {
        method: None,
        file: Some(file.to_string()),
        line,
    })
}

/// Recognizes the progress lines a TeaVM-style tool prints per phase.
fn phase_of_line(line: &str) -> Option<Phase> {
    let line = line.trim();
    let phase = if line.starts_with("Analyzing classes") {
        Phase::DependencyAnalysis
    } else if line.starts_with("Linking") {
        Phase::Linking
    } else if line.starts_with("Optimizing") {
        Phase::Optimization
    } else if line.starts_with("Decompiling") {
        Phase::Decompilation
    } else if line.starts_with("Generating output") || line.starts_with("Rendering") {
        Phase::Rendering
    } else {
        return None;
    };
    Some(phase)
}

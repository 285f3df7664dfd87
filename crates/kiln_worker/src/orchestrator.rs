//! One end-to-end compile: unit → class files → script.

use crate::backend::{BackendCompiler, BuildRequest, ClasspathEntry, Phase};
use crate::error::{io_at, CompileError};
use crate::layout::{reset_dir, Layout};
use crate::phases::PhaseTimer;
use crate::source::{SourceCompiler, SourceTask};
use kiln_cache::ArtifactCaches;
use kiln_diagnostics::{
    CountingSink, Diagnostic, DiagnosticRenderer, DiagnosticSink, LogRenderer, SourceDiagnostic,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The two compilers a compile runs through.
pub struct Toolchain {
    /// Compiles the unit to class files.
    pub source: Box<dyn SourceCompiler>,
    /// Lowers class files to a script.
    pub backend: Box<dyn BackendCompiler>,
}

/// Summary of a successful compile.
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// Diagnostics streamed from both compilers.
    pub diagnostics: usize,
    /// Where the generated script was written.
    pub script: PathBuf,
    /// Wall time of each backend phase.
    pub phases: Vec<(Phase, Duration)>,
}

/// Compiles `text` as the single unit and lowers it to a script.
///
/// Every diagnostic reaches `sink` the moment it is produced. Source
/// diagnostics come first, then backend problems.
pub fn compile(
    layout: &Layout,
    toolchain: &mut Toolchain,
    caches: &mut ArtifactCaches,
    text: &str,
    sink: &mut dyn DiagnosticSink,
) -> Result<CompileReport, CompileError> {
    let start = Instant::now();
    let paths = &layout.paths;
    let renderer = LogRenderer;
    let mut counting = CountingSink::new(sink);

    write_unit(&paths.unit_file, text)?;
    reset_output(&paths.class_output)?;

    let task = SourceTask {
        unit: &paths.unit_file,
        output_dir: &paths.class_output,
        boot_classpath: &paths.boot_image,
    };
    let source_ok = {
        let mut forward = |diag: SourceDiagnostic| {
            let diag = Diagnostic::from(&diag);
            log::debug!("{}", renderer.render(&diag));
            counting.emit(diag);
        };
        toolchain.source.compile(&task, &mut forward)?
    };
    let source_errors = counting.errors();
    log::info!(
        "source compiler finished in {} ms ({} diagnostics)",
        start.elapsed().as_millis(),
        counting.emitted()
    );

    if !source_ok {
        if !has_class_files(&paths.class_output) {
            return Err(CompileError::SourceFailed {
                errors: source_errors,
            });
        }
        log::warn!("source compiler failed but left class output; running backend anyway");
    }

    fs::create_dir_all(&paths.script_output).map_err(io_at(&paths.script_output, |path, source| {
        CompileError::Io { path, source }
    }))?;
    let request = BuildRequest {
        classpath: vec![
            ClasspathEntry::mapped(&paths.library_image, layout.rename_rule.clone()),
            ClasspathEntry::directory(&paths.class_output),
        ],
        entry_point: &layout.entry_point,
        minify: layout.minify,
        incremental: layout.incremental,
        output_dir: &paths.script_output,
        output_name: &layout.output_name,
    };

    let backend_start = Instant::now();
    let before = caches.snapshot();
    let mut timer = PhaseTimer::new();
    let problems = toolchain.backend.build(&request, caches, &mut timer)?;
    let phases = timer.finish();
    caches.log_since(before);

    let mut backend_errors = 0;
    for problem in &problems {
        let rendered = renderer.render_problem(problem);
        if problem.severity.is_error() {
            backend_errors += 1;
            log::error!("{rendered}");
        } else {
            log::warn!("{rendered}");
        }
        counting.emit(Diagnostic::from(problem));
    }
    log::info!(
        "backend finished in {} ms, compile complete in {} ms",
        backend_start.elapsed().as_millis(),
        start.elapsed().as_millis()
    );

    if !source_ok {
        return Err(CompileError::SourceFailed {
            errors: source_errors,
        });
    }
    if backend_errors > 0 {
        return Err(CompileError::BackendFailed {
            errors: backend_errors,
        });
    }
    Ok(CompileReport {
        diagnostics: counting.emitted(),
        script: paths.script_file.clone(),
        phases,
    })
}

fn write_unit(unit: &Path, text: &str) -> Result<(), CompileError> {
    if let Some(parent) = unit.parent() {
        fs::create_dir_all(parent)
            .map_err(io_at(parent, |path, source| CompileError::Io { path, source }))?;
    }
    fs::write(unit, text).map_err(io_at(unit, |path, source| CompileError::Io { path, source }))
}

/// Empties `dir` so only this request's output can appear in it.
fn reset_output(dir: &Path) -> Result<(), CompileError> {
    reset_dir(dir).map_err(io_at(dir, |path, source| CompileError::Io { path, source }))
}

/// Returns `true` if any `.class` file exists below `dir`.
fn has_class_files(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            has_class_files(&path)
        } else {
            path.extension().is_some_and(|ext| ext == "class")
        }
    })
}

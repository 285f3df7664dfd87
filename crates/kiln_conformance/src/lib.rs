//! Conformance helpers for the kiln compile worker.
//!
//! Provides in-process stand-ins for the source and backend compilers, a
//! builder for classlib archives, and a driver that pushes request lines
//! through the real gateway and collects every response for assertion in
//! integration tests.

#![warn(missing_docs)]

use futures::future::{FutureExt, LocalBoxFuture};
use kiln_cache::{ArtifactCaches, CachedArtifact};
use kiln_classfile::{access, parse_class, write_class, Annotation, Attribute, ClassFile, Member};
use kiln_common::{ContentHash, MethodRef};
use kiln_config::{load_config_from_str, WorkerConfig};
use kiln_diagnostics::{CallLocation, Problem, SourceDiagnostic};
use kiln_worker::{
    BackendCompiler, BuildRequest, CompileError, Engine, FetchError, Fetcher, Gateway, Layout,
    Outbox, Phase, ProgressFeedback, ProgressListener, Request, Response, ResponseBody,
    SourceCompiler, SourceTask, Toolchain, UrlFetcher,
};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex};
use tokio::sync::{mpsc, Notify};

/// Marker annotation carried by classes meant to be visible in the library image.
pub const MARKER: &str = "Lorg/teavm/classlib/PlatformMarker;";

/// The smallest unit the stock configuration accepts.
pub const EMPTY_MAIN: &str = "public class Hello {\n    public static void main(String[] args) {\n    }\n}\n";

/// Builds a class file for the classlib archive.
pub fn classlib_class(internal_name: &str, visible: bool) -> Vec<u8> {
    let super_class = (internal_name != "java/lang/Object").then_some("java/lang/Object");
    let mut class = ClassFile::new(internal_name, super_class);
    class
        .methods
        .push(Member::new(access::PUBLIC, "<init>", "()V"));
    if visible {
        class
            .attributes
            .push(Attribute::RuntimeVisibleAnnotations(vec![Annotation::marker(MARKER)]));
    }
    write_class(&class).unwrap()
}

/// Builds a zip archive holding one class file per `(internal name, visible)` pair.
pub fn classlib_archive(classes: &[(&str, bool)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    writer.add_directory("java/", options).unwrap();
    for (name, visible) in classes {
        writer.start_file(format!("{name}.class"), options).unwrap();
        writer.write_all(&classlib_class(name, *visible)).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A small classlib: four visible platform classes and one hidden one.
pub fn standard_classlib() -> Vec<u8> {
    classlib_archive(&[
        ("java/lang/Object", true),
        ("java/lang/String", true),
        ("java/lang/System", true),
        ("java/io/PrintStream", true),
        ("java/lang/ref/Finalizer", false),
    ])
}

/// Writes `bytes` under `dir` and returns a `file://` URL for it.
pub fn publish_archive(dir: &Path, bytes: &[u8]) -> String {
    let path = dir.join("classlib.zip");
    fs::write(&path, bytes).unwrap();
    format!("file://{}", path.display())
}

// ============================================================================
// Source compiler stand-in
// ============================================================================

/// A source compiler that understands just enough of the language to
/// report missing semicolons and unbalanced braces.
///
/// On success it writes one class file for the unit, declaring every
/// `static void name(...)` method it finds.
#[derive(Debug, Default)]
pub struct ToyJavac;

impl SourceCompiler for ToyJavac {
    fn compile(
        &mut self,
        task: &SourceTask<'_>,
        listener: &mut dyn FnMut(SourceDiagnostic),
    ) -> Result<bool, CompileError> {
        let text = fs::read_to_string(task.unit).map_err(|source| CompileError::Io {
            path: task.unit.to_path_buf(),
            source,
        })?;
        let name = task.unit.display().to_string();
        let diagnostics = check_unit(&name, &text);
        let failed = !diagnostics.is_empty();
        for diagnostic in diagnostics {
            listener(diagnostic);
        }
        if failed {
            return Ok(false);
        }

        let class_name = task
            .unit
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("Hello");
        let mut class = ClassFile::new(class_name, Some("java/lang/Object"));
        class
            .methods
            .push(Member::new(access::PUBLIC, "<init>", "()V"));
        for method in declared_methods(&text) {
            let descriptor = if method == "main" {
                MethodRef::MAIN_DESCRIPTOR
            } else {
                "()V"
            };
            class.methods.push(Member::new(
                access::PUBLIC | access::STATIC,
                &method,
                descriptor,
            ));
        }
        let bytes = write_class(&class).map_err(|e| CompileError::Tool {
            tool: "toy-javac".to_string(),
            reason: e.to_string(),
        })?;
        let out = task.output_dir.join(format!("{class_name}.class"));
        fs::write(&out, bytes).map_err(|source| CompileError::Io { path: out, source })?;
        Ok(true)
    }
}

/// Finds missing semicolons and unbalanced braces, in source order.
pub fn check_unit(name: &str, text: &str) -> Vec<SourceDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut offset = 0i64;
    let mut depth = 0i64;
    let mut last_line = 0i64;
    let mut end_offset = 0i64;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let number = index as i64 + 1;
        let trimmed = line.trim_end();
        let content = trimmed.trim_start();
        for ch in content.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        if is_unterminated_statement(content) {
            let column = trimmed.chars().count() as i64 + 1;
            let position = offset + trimmed.len() as i64;
            diagnostics.push(
                SourceDiagnostic::error(name, "compiler.err.expected", "';' expected")
                    .at(number, column)
                    .with_range(position, position, position),
            );
        }
        if depth < 0 {
            let position = offset + (trimmed.len() - content.len()) as i64;
            diagnostics.push(
                SourceDiagnostic::error(
                    name,
                    "compiler.err.expected4",
                    "class, interface, enum, or record expected",
                )
                .at(number, (trimmed.len() - content.len()) as i64 + 1)
                .with_range(position, position, position + 1),
            );
            depth = 0;
        }
        if !content.is_empty() {
            last_line = number;
            end_offset = offset + trimmed.len() as i64;
        }
        offset += line.len() as i64;
    }

    if depth > 0 {
        diagnostics.push(
            SourceDiagnostic::error(
                name,
                "compiler.err.premature.eof",
                "reached end of file while parsing",
            )
            .at(last_line.max(1), 1)
            .with_range(end_offset, end_offset, end_offset),
        );
    }
    diagnostics
}

fn is_unterminated_statement(content: &str) -> bool {
    const DECLARATIONS: [&str; 6] = ["public", "private", "static", "class", "if", "while"];
    if content.is_empty() || content.starts_with("//") || content.starts_with('@') {
        return false;
    }
    if content.ends_with(';') || content.ends_with('{') || content.ends_with('}') {
        return false;
    }
    content.ends_with(')')
        && !DECLARATIONS
            .iter()
            .any(|word| content.split_whitespace().next() == Some(*word))
}

fn declared_methods(text: &str) -> Vec<String> {
    let mut methods = Vec::new();
    for line in text.lines() {
        let Some(rest) = line.split("static void ").nth(1) else {
            continue;
        };
        if let Some(name) = rest.split('(').next() {
            let name = name.trim();
            if !name.is_empty() && !methods.iter().any(|m: &String| m == name) {
                methods.push(name.to_string());
            }
        }
    }
    methods
}

// ============================================================================
// Backend stand-in
// ============================================================================

/// A backend that resolves the entry class and its platform dependencies
/// through the classpath and lowers each method to a stub function.
///
/// Lowered methods are cached in both artifact caches, keyed by method,
/// and reused on later builds when the declaration is unchanged.
#[derive(Debug, Default)]
pub struct ToyBackend {
    /// Methods lowered from scratch by the most recent build.
    pub lowered: usize,
    /// Methods served from the program cache by the most recent build.
    pub reused: usize,
}

impl BackendCompiler for ToyBackend {
    fn build(
        &mut self,
        request: &BuildRequest<'_>,
        caches: &mut ArtifactCaches,
        progress: &mut dyn ProgressListener,
    ) -> Result<Vec<Problem>, CompileError> {
        self.lowered = 0;
        self.reused = 0;
        let entry = request.entry_point;
        let mut problems = Vec::new();

        if progress.phase_started(Phase::DependencyAnalysis, 1) == ProgressFeedback::Cancel {
            return Ok(problems);
        }
        let Some(class) = find_class(request, &entry.class) else {
            problems.push(Problem::error("Class {{c0}} was not found").with_param(entry.class.replace('/', ".")));
            return Ok(problems);
        };
        let location = CallLocation {
            method: Some(entry.clone()),
            file: Some(format!("{}.java", entry.class)),
            line: None,
        };
        for dependency in class.super_class.iter().chain(class.interfaces.iter()) {
            if find_class(request, dependency).is_none() {
                problems.push(
                    Problem::error("Class {{c0}} was not found")
                        .with_param(dependency.replace('/', "."))
                        .at(location.clone()),
                );
            }
        }
        if !class
            .methods
            .iter()
            .any(|m| m.name == entry.name && m.descriptor == entry.descriptor)
        {
            problems.push(Problem::error("Method {{m0}} was not found").with_param(entry.to_string()));
        }
        if !problems.is_empty() {
            return Ok(problems);
        }

        let mut methods: Vec<MethodRef> = class
            .methods
            .iter()
            .map(|m| MethodRef::new(class.this_class.as_str(), m.name.as_str(), m.descriptor.as_str()))
            .collect();
        methods.sort();
        let unused: Vec<&MethodRef> = methods
            .iter()
            .filter(|m| m.name != entry.name && m.name != "<init>")
            .collect();
        for method in unused {
            problems.push(Problem::warning("Method {{m0}} is never called").with_param(method.to_string()));
        }

        for phase in [Phase::Linking, Phase::Optimization] {
            if progress.phase_started(phase, methods.len()) == ProgressFeedback::Cancel {
                return Ok(problems);
            }
        }

        if progress.phase_started(Phase::Decompilation, methods.len()) == ProgressFeedback::Cancel {
            return Ok(problems);
        }
        let mut trees = Vec::with_capacity(methods.len());
        for (index, method) in methods.iter().enumerate() {
            let hash =
                ContentHash::of_method(&method.class, &method.name, &method.descriptor, &[]);
            let tree = match caches.ast.get(method) {
                Some(cached) if cached.matches(&hash) => cached,
                _ => {
                    let fresh = CachedArtifact::new(hash, format!("tree {method}").into_bytes());
                    caches.ast.put(method.clone(), fresh.clone());
                    fresh
                }
            };
            trees.push(tree);
            progress.progress_reached(index + 1);
        }

        if progress.phase_started(Phase::Rendering, methods.len()) == ProgressFeedback::Cancel {
            return Ok(problems);
        }
        let mut script = String::from("\"use strict\";\n");
        for (method, tree) in methods.iter().zip(&trees) {
            let program = match caches.programs.get(method) {
                Some(cached) if cached.matches(&tree.source) => {
                    self.reused += 1;
                    cached
                }
                _ => {
                    self.lowered += 1;
                    let text = format!("function {}() {{}}\n", mangle(method));
                    let fresh = CachedArtifact::new(tree.source, text.into_bytes());
                    caches.programs.put(method.clone(), fresh.clone());
                    fresh
                }
            };
            script.push_str(&String::from_utf8_lossy(&program.bytes));
        }
        script.push_str(&format!("function main(args) {{ {}(args); }}\n", mangle(entry)));

        let out = request.output_dir.join(request.output_name);
        fs::write(&out, script).map_err(|source| CompileError::Io { path: out, source })?;
        Ok(problems)
    }
}

fn find_class(request: &BuildRequest<'_>, internal_name: &str) -> Option<ClassFile> {
    request.classpath.iter().find_map(|entry| {
        let bytes = fs::read(entry.class_file(internal_name)).ok()?;
        parse_class(&bytes).ok()
    })
}

fn mangle(method: &MethodRef) -> String {
    let raw = format!("{}_{}", method.class, method.name);
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// A source compiler that runs [`ToyJavac`], streaming its diagnostics,
/// and then holds the compile open until [`GatedJavac::open`] is called.
///
/// Once opened, the gate stays open for every later compile.
#[derive(Debug, Clone, Default)]
pub struct GatedJavac {
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl GatedJavac {
    /// Creates a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets held and future compiles finish.
    pub fn open(&self) {
        let (open, opened) = &*self.gate;
        *open.lock().unwrap() = true;
        opened.notify_all();
    }

    fn wait(&self) {
        let (open, opened) = &*self.gate;
        let mut open = open.lock().unwrap();
        while !*open {
            open = opened.wait(open).unwrap();
        }
    }
}

impl SourceCompiler for GatedJavac {
    fn compile(
        &mut self,
        task: &SourceTask<'_>,
        listener: &mut dyn FnMut(SourceDiagnostic),
    ) -> Result<bool, CompileError> {
        let ok = ToyJavac.compile(task, listener)?;
        self.wait();
        Ok(ok)
    }
}

// ============================================================================
// Fetchers
// ============================================================================

/// A fetcher that holds every fetch until its gate is opened, then
/// delegates to [`UrlFetcher`].
#[derive(Debug, Default, Clone)]
pub struct GatedFetcher {
    gate: Rc<Notify>,
}

impl GatedFetcher {
    /// Creates a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases one waiting (or the next) fetch.
    pub fn open(&self) {
        self.gate.notify_one();
    }
}

impl Fetcher for GatedFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>> {
        async move {
            self.gate.notified().await;
            UrlFetcher.fetch(url).await
        }
        .boxed_local()
    }
}

// ============================================================================
// Driver
// ============================================================================

/// The stock configuration.
pub fn stock_config() -> WorkerConfig {
    load_config_from_str("").unwrap()
}

/// Builds an engine rooted at `root` with the stand-in compilers.
pub fn toy_engine(root: &Path, fetcher: Box<dyn Fetcher>) -> Engine {
    engine_with(root, Box::new(ToyJavac), fetcher)
}

/// Builds an engine rooted at `root` with the given source compiler and
/// the stand-in backend.
pub fn engine_with(
    root: &Path,
    source: Box<dyn SourceCompiler>,
    fetcher: Box<dyn Fetcher>,
) -> Engine {
    let layout = Layout::initialize(&stock_config(), Some(root));
    Engine::new(
        layout,
        Toolchain {
            source,
            backend: Box::new(ToyBackend::default()),
        },
        fetcher,
    )
}

/// Feeds `lines` through a gateway over `engine` the way a patient client
/// would, sending each line only after the previous one has its terminal
/// response. Returns the engine along with every response, in delivery
/// order.
pub async fn exchange(engine: Engine, lines: Vec<String>) -> (Engine, Vec<Response>) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Response>();
    let client = async move {
        let mut responses = Vec::new();
        for line in lines {
            in_tx.send(line).unwrap();
            while let Some(response) = out_rx.recv().await {
                let terminal = response.is_terminal();
                responses.push(response);
                if terminal {
                    break;
                }
            }
        }
        drop(in_tx);
        while let Some(response) = out_rx.recv().await {
            responses.push(response);
        }
        responses
    };
    let (engine, responses) =
        tokio::join!(Gateway::new(engine, Outbox::new(out_tx)).run(in_rx), client);
    (engine.unwrap(), responses)
}

/// Encodes requests as lines.
pub fn lines(requests: &[Request]) -> Vec<String> {
    requests.iter().map(Request::to_json).collect()
}

/// The responses addressed to `id`, in delivery order.
pub fn responses_for<'a>(responses: &'a [Response], id: &str) -> Vec<&'a Response> {
    responses.iter().filter(|r| r.id == id).collect()
}

/// The diagnostics addressed to `id`.
pub fn diagnostics_for<'a>(
    responses: &'a [Response],
    id: &str,
) -> Vec<&'a kiln_diagnostics::Diagnostic> {
    responses
        .iter()
        .filter(|r| r.id == id)
        .filter_map(|r| match &r.body {
            ResponseBody::Diagnostic(d) => Some(d),
            _ => None,
        })
        .collect()
}

/// Every file below `dir`, relative to it, sorted.
pub fn tree(dir: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_path_buf());
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

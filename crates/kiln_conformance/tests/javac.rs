//! The reference exchanges through a real `javac`, compiling against the
//! boot image. Skipped when no `javac` is on the path.

use kiln_conformance::*;
use kiln_diagnostics::Severity;
use kiln_worker::{JavacCompiler, Request, Response, ResponseBody, UrlFetcher};
use std::process::{Command, Stdio};

fn javac_available() -> bool {
    let found = Command::new("javac")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success());
    if !found {
        eprintln!("javac not found; skipping");
    }
    found
}

fn javac() -> Box<JavacCompiler> {
    Box::new(JavacCompiler::new("javac", vec!["-verbose".to_string()]))
}

#[tokio::test]
async fn empty_main_compiles_with_javac() {
    if !javac_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let engine = engine_with(&dir.path().join("root"), javac(), Box::new(UrlFetcher));

    let (engine, responses) = exchange(
        engine,
        lines(&[
            Request::load_classlib("init", url),
            Request::compile("a", EMPTY_MAIN),
        ]),
    )
    .await;

    assert_eq!(responses, vec![Response::ok("init"), Response::ok("a")]);
    let paths = &engine.layout().paths;
    assert!(paths.class_output.join("Hello.class").is_file());
    assert!(paths.boot_image.join("java/lang/Object.class").is_file());
    let script = std::fs::read_to_string(&paths.script_file).unwrap();
    assert!(script.contains("function main(args)"));
}

#[tokio::test]
async fn missing_semicolon_is_reported_by_javac() {
    if !javac_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let engine = engine_with(&dir.path().join("root"), javac(), Box::new(UrlFetcher));
    let text = "public class Hello {\n    public static void main(String[] args) {\n        System.out.println(\"hi\")\n    }\n}\n";

    let (_, responses) = exchange(
        engine,
        lines(&[
            Request::load_classlib("init", url),
            Request::compile("b", text),
        ]),
    )
    .await;

    let for_b = responses_for(&responses, "b");
    let ResponseBody::Diagnostic(diag) = &for_b[0].body else {
        panic!("expected a diagnostic first, got {:?}", for_b[0]);
    };
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.code, "compiler.err.expected");
    assert_eq!(diag.line, 3);
    assert_eq!(
        for_b.last().copied(),
        Some(&Response::error("b", "source compilation failed with 1 error(s)"))
    );
}

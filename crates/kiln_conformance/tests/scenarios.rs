//! The four reference exchanges: a clean compile, a broken compile, a
//! request rejected while another is in flight, and an unreachable classlib.
//! Arrivals are rejected while either kind of request is in flight.

use kiln_conformance::*;
use kiln_diagnostics::Severity;
use kiln_worker::{Gateway, Outbox, Request, Response, ResponseBody, UrlFetcher};
use tokio::sync::mpsc;

const MISSING_SEMICOLON: &str = "public class Hello {\n    public static void main(String[] args) {\n        System.out.println(\"hi\")\n    }\n}\n";

#[tokio::test]
async fn empty_main_compiles_without_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let engine = toy_engine(&dir.path().join("root"), Box::new(UrlFetcher));

    let (engine, responses) = exchange(
        engine,
        lines(&[
            Request::load_classlib("init", url),
            Request::compile("a", EMPTY_MAIN),
        ]),
    )
    .await;

    assert_eq!(responses, vec![Response::ok("init"), Response::ok("a")]);
    let script = std::fs::read_to_string(&engine.layout().paths.script_file).unwrap();
    assert!(script.contains("function main(args)"));
}

#[tokio::test]
async fn missing_semicolon_streams_error_then_fails() {
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let engine = toy_engine(&dir.path().join("root"), Box::new(UrlFetcher));

    let (engine, responses) = exchange(
        engine,
        lines(&[
            Request::load_classlib("init", url),
            Request::compile("b", MISSING_SEMICOLON),
        ]),
    )
    .await;

    let for_b = responses_for(&responses, "b");
    assert_eq!(for_b.len(), 2);
    let ResponseBody::Diagnostic(diag) = &for_b[0].body else {
        panic!("expected a diagnostic first, got {:?}", for_b[0]);
    };
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.code, "compiler.err.expected");
    assert_eq!(diag.message, "';' expected");
    assert_eq!(diag.line, 3);
    assert_eq!(diag.source.kind, "SOURCE");
    assert_eq!(
        for_b[1],
        &Response::error("b", "source compilation failed with 1 error(s)")
    );
    assert!(!engine.layout().paths.script_file.exists());
}

#[tokio::test]
async fn second_request_is_busy_while_compile_runs() {
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let javac = GatedJavac::new();
    let engine = engine_with(
        &dir.path().join("root"),
        Box::new(javac.clone()),
        Box::new(UrlFetcher),
    );

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let gateway = Gateway::new(engine, Outbox::new(out_tx));

    let driver = async move {
        in_tx
            .send(Request::load_classlib("init", url).to_json())
            .unwrap();
        let loaded = out_rx.recv().await.unwrap();
        in_tx.send(Request::compile("r1", EMPTY_MAIN).to_json()).unwrap();
        in_tx.send(Request::compile("r2", EMPTY_MAIN).to_json()).unwrap();
        let rejected = out_rx.recv().await.unwrap();
        javac.open();
        drop(in_tx);
        let mut rest = Vec::new();
        while let Some(response) = out_rx.recv().await {
            rest.push(response);
        }
        (loaded, rejected, rest)
    };
    let (engine, (loaded, rejected, rest)) = tokio::join!(gateway.run(in_rx), driver);

    assert_eq!(loaded, Response::ok("init"));
    assert_eq!(rejected, Response::busy("r2"));
    assert_eq!(rest, vec![Response::ok("r1")]);
    assert!(engine.unwrap().layout().paths.script_file.is_file());
}

#[tokio::test]
async fn diagnostics_are_delivered_while_the_compile_is_still_running() {
    let dir = tempfile::tempdir().unwrap();
    let javac = GatedJavac::new();
    let engine = engine_with(
        &dir.path().join("root"),
        Box::new(javac.clone()),
        Box::new(UrlFetcher),
    );

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let gateway = Gateway::new(engine, Outbox::new(out_tx));

    let driver = async move {
        in_tx
            .send(Request::compile("b", MISSING_SEMICOLON).to_json())
            .unwrap();
        let streamed = out_rx.recv().await.unwrap();
        in_tx.send(Request::compile("late", EMPTY_MAIN).to_json()).unwrap();
        let rejected = out_rx.recv().await.unwrap();
        javac.open();
        drop(in_tx);
        let mut rest = Vec::new();
        while let Some(response) = out_rx.recv().await {
            rest.push(response);
        }
        (streamed, rejected, rest)
    };
    let (engine, (streamed, rejected, rest)) = tokio::join!(gateway.run(in_rx), driver);

    assert!(engine.is_ok());
    assert_eq!(streamed.id, "b");
    let ResponseBody::Diagnostic(diag) = &streamed.body else {
        panic!("expected a diagnostic first, got {streamed:?}");
    };
    assert_eq!(diag.code, "compiler.err.expected");
    assert_eq!(rejected, Response::busy("late"));
    assert_eq!(
        rest,
        vec![Response::error("b", "source compilation failed with 1 error(s)")]
    );
}

#[tokio::test]
async fn second_request_is_busy_while_classlib_loads() {
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let fetcher = GatedFetcher::new();
    let engine = toy_engine(&dir.path().join("root"), Box::new(fetcher.clone()));

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let gateway = Gateway::new(engine, Outbox::new(out_tx));

    let driver = async move {
        in_tx
            .send(Request::load_classlib("r1", url).to_json())
            .unwrap();
        in_tx
            .send(Request::compile("r2", EMPTY_MAIN).to_json())
            .unwrap();
        let rejected = out_rx.recv().await.unwrap();
        fetcher.open();
        drop(in_tx);
        let mut rest = Vec::new();
        while let Some(response) = out_rx.recv().await {
            rest.push(response);
        }
        (rejected, rest)
    };
    let (engine, (rejected, rest)) = tokio::join!(gateway.run(in_rx), driver);

    assert_eq!(rejected, Response::busy("r2"));
    assert_eq!(rest, vec![Response::ok("r1")]);
    let engine = engine.unwrap();
    assert!(!tree(&engine.layout().paths.library_image).is_empty());
}

#[tokio::test]
async fn unreachable_classlib_fails_and_leaves_image_empty() {
    let dir = tempfile::tempdir().unwrap();
    let engine = toy_engine(&dir.path().join("root"), Box::new(UrlFetcher));

    let (engine, responses) = exchange(
        engine,
        lines(&[Request::load_classlib(
            "d",
            "http://127.0.0.1:1/classlib.zip",
        )]),
    )
    .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, "d");
    let ResponseBody::Error { text } = &responses[0].body else {
        panic!("expected an error, got {:?}", responses[0]);
    };
    assert!(text.starts_with("network error: GET http://127.0.0.1:1/classlib.zip"));
    assert!(tree(&engine.layout().paths.library_image).is_empty());
}

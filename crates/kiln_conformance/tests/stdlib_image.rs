//! Library image construction from classlib archives.

use kiln_conformance::*;
use kiln_worker::{Request, Response, UrlFetcher};
use std::path::PathBuf;

#[tokio::test]
async fn only_marked_classes_reach_the_image_under_renamed_paths() {
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let engine = toy_engine(&dir.path().join("root"), Box::new(UrlFetcher));

    let (engine, responses) =
        exchange(engine, lines(&[Request::load_classlib("init", url)])).await;

    assert_eq!(responses, vec![Response::ok("init")]);
    assert_eq!(
        tree(&engine.layout().paths.library_image),
        vec![
            PathBuf::from("org/teavm/classlib/java/io/TPrintStream.class"),
            PathBuf::from("org/teavm/classlib/java/lang/TObject.class"),
            PathBuf::from("org/teavm/classlib/java/lang/TString.class"),
            PathBuf::from("org/teavm/classlib/java/lang/TSystem.class"),
        ]
    );
    assert_eq!(tree(&engine.layout().paths.stdlib_staging).len(), 5);
}

#[tokio::test]
async fn reloading_the_same_archive_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), &standard_classlib());
    let engine = toy_engine(&dir.path().join("root"), Box::new(UrlFetcher));

    let (engine, _) = exchange(engine, lines(&[Request::load_classlib("1", url.as_str())])).await;
    let image = engine.layout().paths.library_image.clone();
    let snapshot = |files: &[PathBuf]| -> Vec<Vec<u8>> {
        files
            .iter()
            .map(|f| std::fs::read(image.join(f)).unwrap())
            .collect()
    };
    let first_files = tree(&image);
    let first = snapshot(&first_files);

    let (_, responses) = exchange(engine, lines(&[Request::load_classlib("2", url.as_str())])).await;
    assert_eq!(responses, vec![Response::ok("2")]);
    assert_eq!(tree(&image), first_files);
    assert_eq!(snapshot(&first_files), first);
}

#[tokio::test]
async fn corrupt_class_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("java/lang/Object.class", options).unwrap();
    std::io::Write::write_all(&mut writer, &classlib_class("java/lang/Object", true)).unwrap();
    writer.start_file("java/lang/Broken.class", options).unwrap();
    std::io::Write::write_all(&mut writer, b"\xCA\xFE\xBA\xBE\x00").unwrap();
    let archive = writer.finish().unwrap().into_inner();
    let url = publish_archive(dir.path(), &archive);
    let engine = toy_engine(&dir.path().join("root"), Box::new(UrlFetcher));

    let (engine, responses) =
        exchange(engine, lines(&[Request::load_classlib("init", url)])).await;

    assert_eq!(responses, vec![Response::ok("init")]);
    assert_eq!(
        tree(&engine.layout().paths.library_image),
        vec![PathBuf::from("org/teavm/classlib/java/lang/TObject.class")]
    );
}

#[tokio::test]
async fn garbage_archive_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = publish_archive(dir.path(), b"this is not a zip file");
    let engine = toy_engine(&dir.path().join("root"), Box::new(UrlFetcher));

    let (engine, responses) =
        exchange(engine, lines(&[Request::load_classlib("init", url)])).await;

    assert_eq!(responses.len(), 1);
    assert!(responses[0].is_terminal());
    assert_ne!(responses[0], Response::ok("init"));
    assert!(tree(&engine.layout().paths.library_image).is_empty());
}

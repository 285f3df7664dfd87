//! Newline-delimited JSON over a byte stream pair.
//!
//! The reader, the gateway and the writer share one task. Compiles run on
//! the blocking pool, so lines keep arriving and responses keep leaving
//! while one is in flight.

use crate::engine::Engine;
use crate::gateway::{Gateway, Outbox};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Serves one request per line of `reader` and writes one response per
/// line to `writer`, until `reader` reaches end of input and every
/// response has been flushed. Blank lines are ignored.
pub async fn serve<R, W>(engine: Engine, reader: R, mut writer: W) -> io::Result<Engine>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let gateway = Gateway::new(engine, Outbox::new(out_tx));

    let read = async move {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if in_tx.send(line).is_err() {
                break;
            }
        }
        log::debug!("end of input");
        Ok::<_, io::Error>(())
    };

    let write = async {
        while let Some(response) = out_rx.recv().await {
            let mut json = response.to_json()?;
            json.push('\n');
            writer.write_all(json.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<_, io::Error>(())
    };

    let (read, engine, write) = tokio::join!(read, gateway.run(in_rx), write);
    read?;
    write?;
    engine.map_err(|err| io::Error::new(io::ErrorKind::Other, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCompiler, BuildRequest, ProgressListener};
    use crate::error::{CompileError, FetchError};
    use crate::fetch::Fetcher;
    use crate::layout::Layout;
    use crate::orchestrator::Toolchain;
    use crate::protocol::Response;
    use crate::source::{SourceCompiler, SourceTask};
    use futures::future::{FutureExt, LocalBoxFuture};
    use kiln_cache::ArtifactCaches;
    use kiln_config::load_config_from_str;
    use kiln_diagnostics::{Problem, SourceDiagnostic};
    use tokio::io::BufReader;

    struct Javac;

    impl SourceCompiler for Javac {
        fn compile(
            &mut self,
            task: &SourceTask<'_>,
            _listener: &mut dyn FnMut(SourceDiagnostic),
        ) -> Result<bool, CompileError> {
            std::fs::write(task.output_dir.join("Hello.class"), b"class").unwrap();
            Ok(true)
        }
    }

    struct Backend;

    impl BackendCompiler for Backend {
        fn build(
            &mut self,
            _request: &BuildRequest<'_>,
            _caches: &mut ArtifactCaches,
            _progress: &mut dyn ProgressListener,
        ) -> Result<Vec<Problem>, CompileError> {
            Ok(vec![Problem::warning("nothing to do")])
        }
    }

    struct Offline;

    impl Fetcher for Offline {
        fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>> {
            async move {
                Err(FetchError::UnsupportedScheme(url.to_string()))
            }
            .boxed_local()
        }
    }

    #[tokio::test]
    async fn serves_lines_until_end_of_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_str("").unwrap();
        let engine = Engine::new(
            Layout::initialize(&config, Some(dir.path())),
            Toolchain {
                source: Box::new(Javac),
                backend: Box::new(Backend),
            },
            Box::new(Offline),
        );
        let input = concat!(
            r#"{"id":"1","kind":"compile","text":"public class Hello {}"}"#,
            "\n\n",
            r#"{"id":"2","kind":"load-classlib","url":"gopher://x"}"#,
            "\n"
        );
        let mut output = Vec::new();
        serve(engine, BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();

        let responses: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        // Line 2 may arrive while line 1 is compiling, so its answer can
        // be either Busy or its own failure, interleaved with line 1's.
        assert_eq!(responses.len(), 3);
        let first: Vec<&Response> = responses.iter().filter(|r| r.id == "1").collect();
        assert_eq!(first.len(), 2);
        assert!(!first[0].is_terminal());
        assert_eq!(first[1], &Response::ok("1"));
        let second: Vec<&Response> = responses.iter().filter(|r| r.id == "2").collect();
        assert_eq!(second.len(), 1);
        assert!(second[0].is_terminal());
    }
}

//! Everything the single pipeline owns between requests.

use crate::error::{CompileError, PrepareError, WorkerError};
use crate::fetch::Fetcher;
use crate::gateway::{failure_text, Outbox};
use crate::layout::Layout;
use crate::orchestrator::{self, CompileReport, Toolchain};
use crate::protocol::{Command, Request, Response};
use crate::stdlib::{self, PrepareReport};
use kiln_cache::ArtifactCaches;
use kiln_diagnostics::{Diagnostic, DiagnosticSink};
use std::panic::{self, AssertUnwindSafe};

/// The worker's state: layout, caches and the tools that act on them.
///
/// Only one request runs against an engine at a time; the gateway hands
/// it to the pipeline by value and takes it back when the request ends.
pub struct Engine {
    layout: Layout,
    caches: ArtifactCaches,
    /// `None` only while a compile holds it on the blocking pool.
    toolchain: Option<Toolchain>,
    fetcher: Box<dyn Fetcher>,
}

impl Engine {
    /// Creates an engine with empty caches.
    pub fn new(layout: Layout, toolchain: Toolchain, fetcher: Box<dyn Fetcher>) -> Self {
        Self {
            layout,
            caches: ArtifactCaches::new(),
            toolchain: Some(toolchain),
            fetcher,
        }
    }

    /// The resolved filesystem layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The artifact caches shared by every compile.
    pub fn caches(&self) -> &ArtifactCaches {
        &self.caches
    }

    /// Runs `request` to completion and returns its terminal response.
    ///
    /// Diagnostics go out through `outbox` while the request runs.
    pub async fn handle(&mut self, request: &Request, outbox: &Outbox) -> Response {
        let id = request.id.as_str();
        match &request.command {
            Command::LoadClasslib { url } => match self.load_classlib(url).await {
                Ok(_) => Response::ok(id),
                Err(err) => {
                    log::error!("[{id}] load-classlib failed: {err}");
                    Response::error(id, err.to_string())
                }
            },
            Command::Compile { text } => {
                let outbox = outbox.clone();
                let owner = id.to_string();
                let forward = move |diagnostic: Diagnostic| {
                    outbox.send(Response::diagnostic(owner.as_str(), diagnostic));
                };
                match self.compile(text, forward).await {
                    Ok(_) => Response::ok(id),
                    Err(err) => {
                        log::info!("[{id}] compile failed: {err}");
                        Response::error(id, err.to_string())
                    }
                }
            }
            Command::Unknown(kind) => {
                let err = WorkerError::UnknownKind(kind.clone());
                log::warn!("[{id}] {err}");
                Response::error(id, failure_text(&err))
            }
        }
    }

    /// Rebuilds the library image from the archive at `url`.
    pub async fn load_classlib(&mut self, url: &str) -> Result<PrepareReport, PrepareError> {
        if !self.caches.is_empty() {
            // Cached artifacts were built against the previous image.
            log::warn!(
                "reloading stdlib with {} cached artifacts from the previous image",
                self.caches.entry_count()
            );
        }
        stdlib::prepare(&self.layout, self.fetcher.as_ref(), url).await
    }

    /// Compiles `text` on the blocking pool, streaming every diagnostic into
    /// `sink` from there as it is produced.
    ///
    /// The toolchain and caches travel to the compile thread and back. A
    /// panic in either compiler is resumed here once they are returned.
    pub async fn compile<S>(&mut self, text: &str, mut sink: S) -> Result<CompileReport, CompileError>
    where
        S: DiagnosticSink + Send + 'static,
    {
        let mut toolchain = self.toolchain.take().ok_or_else(|| {
            CompileError::Interrupted("toolchain was lost by an earlier compile".to_string())
        })?;
        let mut caches = std::mem::take(&mut self.caches);
        let layout = self.layout.clone();
        let text = text.to_string();

        let joined = tokio::task::spawn_blocking(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                orchestrator::compile(&layout, &mut toolchain, &mut caches, &text, &mut sink)
            }));
            (toolchain, caches, outcome)
        })
        .await;

        match joined {
            Ok((toolchain, caches, outcome)) => {
                self.toolchain = Some(toolchain);
                self.caches = caches;
                outcome.unwrap_or_else(|payload| panic::resume_unwind(payload))
            }
            Err(err) => {
                log::error!("compile thread did not return: {err}");
                Err(CompileError::Interrupted(err.to_string()))
            }
        }
    }
}

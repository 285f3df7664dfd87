//! The kiln compile worker.
//!
//! Requests arrive one JSON object per line. The [`Gateway`] admits at most
//! one request at a time: `load-classlib` rebuilds the library image from a
//! classlib archive ([`stdlib`]), `compile` turns a single unit into a script
//! through the source and backend compilers ([`orchestrator`]). Every
//! request gets exactly one terminal `ok` or `error`, preceded by any
//! diagnostics it produced.

#![warn(missing_docs)]

pub mod backend;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod layout;
pub mod orchestrator;
pub mod phases;
pub mod protocol;
pub mod source;
pub mod stdlib;
pub mod transport;

pub use backend::{
    BackendCompiler, BuildRequest, ClasspathEntry, Phase, ProcessBackend, ProgressFeedback,
    ProgressListener,
};
pub use engine::Engine;
pub use error::{CompileError, FetchError, PrepareError, WorkerError};
pub use fetch::{Fetcher, UrlFetcher};
pub use gateway::{Gateway, Outbox};
pub use layout::Layout;
pub use orchestrator::{CompileReport, Toolchain};
pub use phases::PhaseTimer;
pub use protocol::{decode_request, Command, Request, Response, ResponseBody, BUSY};
pub use source::{JavacCompiler, SourceCompiler, SourceTask};
pub use stdlib::PrepareReport;
pub use transport::serve;

//! Error types for the worker pipelines.
//!
//! User-facing compiler problems are not errors here: they travel as
//! diagnostics, and only the final verdict becomes a [`CompileError`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching the stdlib archive.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request failed or returned an error status.
    #[error("GET {url}: {reason}")]
    Http {
        /// The requested URL.
        url: String,
        /// Transport or status error.
        reason: String,
    },

    /// A local file could not be read.
    #[error("failed to read {path}: {source}")]
    File {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The URL scheme is not one the fetcher understands.
    #[error("unsupported URL scheme in '{0}'")]
    UnsupportedScheme(String),
}

/// Errors raised by the stdlib preparer.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// The archive could not be fetched.
    #[error("network error: {0}")]
    Network(#[from] FetchError),

    /// The archive is not a readable zip file.
    #[error("archive error: {0}")]
    Archive(String),

    /// An archive entry has a name that would escape the staging area.
    #[error("archive error: malformed entry name '{0}'")]
    MalformedEntry(String),

    /// Writing the staging area or library image failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that fail a compile request.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The source compiler failed and produced no class output.
    #[error("source compilation failed with {errors} error(s)")]
    SourceFailed {
        /// Error-level diagnostics streamed for the unit.
        errors: usize,
    },

    /// The backend reported at least one error-level problem.
    #[error("script generation failed with {errors} error(s)")]
    BackendFailed {
        /// Error-level problems reported by the backend.
        errors: usize,
    },

    /// A compiler could not be run at all.
    #[error("failed to run {tool}: {reason}")]
    Tool {
        /// The compiler that failed to start.
        tool: String,
        /// Why it failed.
        reason: String,
    },

    /// Preparing the unit or output areas failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compile thread was torn down before it returned the toolchain.
    #[error("compile interrupted: {0}")]
    Interrupted(String),
}

/// Errors answered at the gateway boundary.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The request's `kind` names no known command.
    #[error("unknown request kind '{0}'")]
    UnknownKind(String),

    /// The request line is not a valid message.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// The pipeline panicked.
    #[error("{0}")]
    Panicked(String),
}

/// Builds a closure that wraps an I/O error with the path being written.
pub(crate) fn io_at<E>(
    path: &std::path::Path,
    wrap: impl FnOnce(PathBuf, std::io::Error) -> E,
) -> impl FnOnce(std::io::Error) -> E {
    let path = path.to_path_buf();
    move |source| wrap(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_display() {
        let err = PrepareError::from(FetchError::Http {
            url: "http://localhost:1/x.zip".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "network error: GET http://localhost:1/x.zip: connection refused"
        );
    }

    #[test]
    fn compile_error_display() {
        assert_eq!(
            CompileError::SourceFailed { errors: 2 }.to_string(),
            "source compilation failed with 2 error(s)"
        );
        assert_eq!(
            CompileError::BackendFailed { errors: 1 }.to_string(),
            "script generation failed with 1 error(s)"
        );
    }

    #[test]
    fn worker_error_display() {
        assert_eq!(
            WorkerError::UnknownKind("reset".into()).to_string(),
            "unknown request kind 'reset'"
        );
    }

    #[test]
    fn io_at_keeps_path() {
        let wrap = io_at(std::path::Path::new("/tmp/x"), |path, source| {
            PrepareError::Io { path, source }
        });
        let err = wrap(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "failed to write /tmp/x: disk full");
    }
}
